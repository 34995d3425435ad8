//! Scheduled batch publishing of due content items.

use std::time::Instant;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::types::PublishSummary;

pub const METRIC_PUBLISH_ITEMS_TOTAL: &str = "pressroom_publish_items_total";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to load unpublished content: {0}")]
    Load(#[source] RepoError),
    #[error("failed to commit batch of {candidates} items: {source}")]
    Commit {
        candidates: usize,
        #[source]
        source: RepoError,
    },
}

/// Publish every item that is due at `now` as one atomic batch.
///
/// Returns `None` when nothing is due, or when an overlapping run already
/// published every candidate. A failed commit
/// leaves the whole candidate set unpublished for the next run.
pub async fn publish_due(
    repo: &dyn ContentRepo,
    now: OffsetDateTime,
) -> Result<Option<PublishSummary>, PublishError> {
    let started_at = Instant::now();

    let unpublished = repo.list_unpublished().await.map_err(|err| {
        warn!(
            target = "application::publish",
            op = "publish_due",
            result = "load_error",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            error = %err,
            "Failed to list unpublished content"
        );
        PublishError::Load(err)
    })?;

    let due: Vec<Uuid> = unpublished
        .iter()
        .filter(|item| item.is_due(now))
        .map(|item| item.id)
        .collect();

    if due.is_empty() {
        info!(
            target = "application::publish",
            op = "publish_due",
            result = "noop",
            unpublished = unpublished.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "No content due for publishing"
        );
        return Ok(None);
    }

    let published_count = repo.publish_batch(&due, now).await.map_err(|err| {
        warn!(
            target = "application::publish",
            op = "publish_due",
            result = "commit_error",
            candidates = due.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            error = %err,
            "Batch publish commit failed; items remain unpublished"
        );
        PublishError::Commit {
            candidates: due.len(),
            source: err,
        }
    })?;

    if published_count == 0 {
        info!(
            target = "application::publish",
            op = "publish_due",
            result = "noop",
            candidates = due.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Due content was already published by an overlapping run"
        );
        return Ok(None);
    }

    counter!(METRIC_PUBLISH_ITEMS_TOTAL).increment(published_count);
    info!(
        target = "application::publish",
        op = "publish_due",
        result = "published",
        candidates = due.len(),
        published_count,
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "Published due content"
    );

    Ok(Some(PublishSummary { published_count }))
}
