use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pressroom_api_types::ErrorResponse;

use crate::application::error::ErrorReport;

pub mod messages {
    pub const RENDER_FIELDS_REQUIRED: &str = "imageUrl and weekStart are required";
    pub const WEEK_START_REQUIRED: &str = "week_start is required";
    pub const INVALID_WEEK_START: &str = "Invalid weekStart";
    pub const RENDER_FAILED: &str = "Failed to process image";
    pub const UPLOAD_FAILED: &str = "Failed to upload processed image";
    pub const NO_TRACKS: &str = "No tracks found for this week";
    pub const FETCH_TRACKS_FAILED: &str = "Failed to fetch tracks";
    pub const DISPATCH_FAILED: &str = "Failed to trigger workflow";
    pub const CODE_REQUIRED: &str = "Authorization code is required";
    pub const REDIRECT_URI_REQUIRED: &str = "Redirect URI is required";
    pub const TOKEN_EXCHANGE_INTERNAL: &str = "Internal server error during token exchange";
    pub const PUBLISH_FAILED: &str = "Failed to publish scheduled content";
    pub const ARTIFACT_NOT_FOUND: &str = "Artifact not found";
    pub const INTERNAL: &str = "Internal server error";
}

/// JSON error response (`{error, details?}`) carrying a diagnostic report for the logger.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(source: &'static str, status: StatusCode, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status,
            report: ErrorReport::from_message(source, status, error.clone()),
            error,
            details: None,
        }
    }

    /// Error whose `details` carry the failure text and whose report carries its source chain.
    pub fn with_source(
        source: &'static str,
        status: StatusCode,
        error: impl Into<String>,
        err: &dyn StdError,
    ) -> Self {
        Self {
            status,
            error: error.into(),
            details: Some(err.to_string()),
            report: ErrorReport::from_error(source, status, err),
        }
    }

    pub fn bad_request(source: &'static str, error: impl Into<String>) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(source: &'static str, error: impl Into<String>) -> Self {
        Self::new(source, StatusCode::NOT_FOUND, error)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error,
            details: self.details,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
