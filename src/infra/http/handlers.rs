use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use pressroom_api_types::{
    DispatchWorkflowRequest, DispatchWorkflowResponse, PublishRunResponse, RenderImageRequest,
    RenderImageResponse, TokenExchangeRequest, TokenExchangeResponse,
};
use time::OffsetDateTime;
use tracing::info;

use crate::application::dispatch::{DispatchError, WorkflowClientError};
use crate::application::oauth::IssuerError;
use crate::application::publish::publish_due;
use crate::application::render::RenderPipelineError;
use crate::application::storage::StorageError;
use crate::domain::entities::RenderRequest;
use crate::domain::types::SchedulingKey;

use super::error::{ApiError, messages};
use super::state::AppState;

const SOURCE_SCHEDULER: &str = "infra::http::scheduler";
const SOURCE_RENDER: &str = "infra::http::render";
const SOURCE_DISPATCH: &str = "infra::http::dispatch";
const SOURCE_OAUTH: &str = "infra::http::oauth";
const SOURCE_ARTIFACTS: &str = "infra::http::artifacts";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn scheduling_key(source: &'static str, raw: String) -> Result<SchedulingKey, ApiError> {
    SchedulingKey::parse(raw).map_err(|err| {
        ApiError::with_source(
            source,
            StatusCode::BAD_REQUEST,
            messages::INVALID_WEEK_START,
            &err,
        )
    })
}

/// Run the scheduled batch publisher once; `null` when nothing was due.
pub async fn run_scheduler(
    State(state): State<AppState>,
) -> Result<Json<Option<PublishRunResponse>>, ApiError> {
    let summary = publish_due(state.content.as_ref(), OffsetDateTime::now_utc())
        .await
        .map_err(|err| {
            ApiError::with_source(
                SOURCE_SCHEDULER,
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::PUBLISH_FAILED,
                &err,
            )
        })?;

    Ok(Json(summary.map(|s| PublishRunResponse {
        published_count: s.published_count,
    })))
}

pub async fn render_image(
    State(state): State<AppState>,
    Json(body): Json<RenderImageRequest>,
) -> Result<Json<RenderImageResponse>, ApiError> {
    let (Some(image_url), Some(week_start)) =
        (non_empty(body.image_url), non_empty(body.week_start))
    else {
        return Err(ApiError::bad_request(
            SOURCE_RENDER,
            messages::RENDER_FIELDS_REQUIRED,
        ));
    };
    let key = scheduling_key(SOURCE_RENDER, week_start)?;
    let request = RenderRequest::new(image_url, body.track_name, body.artist_name);

    let artifact = state
        .render
        .render_and_store(&key, &request)
        .await
        .map_err(|err| {
            let message = match &err {
                RenderPipelineError::Invoke(_) => messages::RENDER_FAILED,
                RenderPipelineError::Upload(_) => messages::UPLOAD_FAILED,
            };
            ApiError::with_source(
                SOURCE_RENDER,
                StatusCode::INTERNAL_SERVER_ERROR,
                message,
                &err,
            )
        })?;

    Ok(Json(RenderImageResponse {
        success: true,
        processed_image_url: artifact.versioned_url(OffsetDateTime::now_utc()),
    }))
}

pub async fn dispatch_workflow(
    State(state): State<AppState>,
    Json(body): Json<DispatchWorkflowRequest>,
) -> Result<(StatusCode, Json<DispatchWorkflowResponse>), ApiError> {
    let Some(week_start) = non_empty(body.week_start) else {
        return Err(ApiError::bad_request(
            SOURCE_DISPATCH,
            messages::WEEK_START_REQUIRED,
        ));
    };
    let key = scheduling_key(SOURCE_DISPATCH, week_start)?;

    let request = state.dispatcher.dispatch(&key).await.map_err(|err| {
        let (status, message) = match &err {
            DispatchError::NoWorkUnits(_) => (StatusCode::NOT_FOUND, messages::NO_TRACKS),
            DispatchError::Repo(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::FETCH_TRACKS_FAILED,
            ),
            DispatchError::Client(WorkflowClientError::Remote { .. }) => {
                (StatusCode::BAD_GATEWAY, messages::DISPATCH_FAILED)
            }
            DispatchError::Client(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, messages::DISPATCH_FAILED)
            }
        };
        ApiError::with_source(SOURCE_DISPATCH, status, message, &err)
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchWorkflowResponse {
            success: true,
            week_start: request.scheduling_key.to_string(),
            tracks_count: request.work_unit_count,
        }),
    ))
}

pub async fn exchange_token(
    State(state): State<AppState>,
    Json(body): Json<TokenExchangeRequest>,
) -> Result<Json<TokenExchangeResponse>, ApiError> {
    let Some(code) = non_empty(body.code) else {
        return Err(ApiError::bad_request(SOURCE_OAUTH, messages::CODE_REQUIRED));
    };
    let Some(redirect_uri) = non_empty(body.redirect_uri).or(state.default_redirect_uri.clone())
    else {
        return Err(ApiError::bad_request(
            SOURCE_OAUTH,
            messages::REDIRECT_URI_REQUIRED,
        ));
    };

    match state.issuer.exchange_code(&code, &redirect_uri).await {
        Ok(token) => {
            info!(
                target = "infra::http::oauth",
                op = "oauth::exchange_code",
                result = "ok",
                expires_in = token.expires_in,
                "Authorization code exchanged"
            );
            Ok(Json(TokenExchangeResponse {
                access_token: Some(token.access_token),
                expires_in: token.expires_in,
                error: None,
            }))
        }
        Err(err @ IssuerError::NotConfigured) => Err(ApiError::new(
            SOURCE_OAUTH,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string(),
        )),
        Err(err @ IssuerError::Provider { .. }) => Err(ApiError::new(
            SOURCE_OAUTH,
            StatusCode::BAD_REQUEST,
            err.to_string(),
        )),
        Err(err @ IssuerError::Transport(_)) => Err(ApiError::with_source(
            SOURCE_OAUTH,
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::TOKEN_EXCHANGE_INTERNAL,
            &err,
        )),
    }
}

pub async fn get_artifact(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let Some(store) = state.artifacts.as_ref() else {
        return Err(ApiError::not_found(
            SOURCE_ARTIFACTS,
            messages::ARTIFACT_NOT_FOUND,
        ));
    };

    match store.get(&key).await {
        Ok(bytes) => Ok((
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "max-age=0"),
            ],
            bytes,
        )
            .into_response()),
        Err(err @ (StorageError::NotFound(_) | StorageError::InvalidKey(_))) => Err(
            ApiError::with_source(
                SOURCE_ARTIFACTS,
                StatusCode::NOT_FOUND,
                messages::ARTIFACT_NOT_FOUND,
                &err,
            ),
        ),
        Err(err) => Err(ApiError::with_source(
            SOURCE_ARTIFACTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::INTERNAL,
            &err,
        )),
    }
}
