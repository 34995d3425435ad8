//! Domain entities handled by the publishing pipeline.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

const DEFAULT_TRACK_NAME: &str = "Custom Image";
const DEFAULT_ARTIST_NAME: &str = "Custom";

/// A piece of content waiting to become publicly visible.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub scheduled_for: Option<OffsetDateTime>,
    pub is_published: bool,
    pub published_at: Option<OffsetDateTime>,
}

impl ContentItem {
    /// Unpublished and scheduled at or before `now`. Unscheduled items are never due.
    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        !self.is_published && self.scheduled_for.is_some_and(|at| at <= now)
    }
}

/// Request sent to the external renderer; also its stdin document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub image_url: String,
    pub track_name: String,
    pub artist_name: String,
}

impl RenderRequest {
    pub fn new(
        image_url: impl Into<String>,
        track_name: Option<String>,
        artist_name: Option<String>,
    ) -> Self {
        Self {
            image_url: image_url.into(),
            track_name: non_blank(track_name).unwrap_or_else(|| DEFAULT_TRACK_NAME.to_string()),
            artist_name: non_blank(artist_name)
                .unwrap_or_else(|| DEFAULT_ARTIST_NAME.to_string()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Decoded image bytes produced by one render invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: bytes::Bytes,
    pub exit_code: Option<i32>,
}

/// Persisted render output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub storage_key: String,
    pub public_url: String,
    pub checksum: String,
    pub size_bytes: u64,
}

impl Artifact {
    /// Public URL with a cache-busting `v` parameter in unix milliseconds.
    pub fn versioned_url(&self, at: OffsetDateTime) -> String {
        let millis = at.unix_timestamp_nanos() / 1_000_000;
        let separator = if self.public_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}v={millis}", self.public_url)
    }
}
