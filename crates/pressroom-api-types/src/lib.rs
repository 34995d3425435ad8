//! Wire types shared by the pressroom HTTP API, its clients and the OAuth popup.
//!
//! Request bodies keep every field optional so that handlers can report a
//! missing field as a typed business error instead of a deserialisation
//! rejection.

use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Result of one scheduler run. A run that found nothing due is reported as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRunResponse {
    pub published_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderImageRequest {
    pub image_url: Option<String>,
    pub week_start: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderImageResponse {
    pub success: bool,
    pub processed_image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchWorkflowRequest {
    pub week_start: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchWorkflowResponse {
    pub success: bool,
    pub week_start: String,
    pub tracks_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenExchangeRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Body returned by the token exchange endpoint.
///
/// Success carries `access_token`; failure carries `error`. Both are optional
/// on the wire so that a client can decode either shape with one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenExchangeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Message posted from the OAuth popup to the window that opened it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthMessage {
    #[serde(rename = "INSTAGRAM_AUTH_SUCCESS")]
    Success {
        #[serde(rename = "accessToken")]
        access_token: String,
    },
    #[serde(rename = "INSTAGRAM_AUTH_ERROR")]
    Error { error: String },
}

impl AuthMessage {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
