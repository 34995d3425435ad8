//! HTTP surface: external triggers for each pipeline component.

pub mod error;
pub mod handlers;
pub mod middleware;
mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use self::middleware::{log_responses, set_request_context};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/scheduler/run", post(handlers::run_scheduler))
        .route("/api/render", post(handlers::render_image))
        .route("/api/workflows/dispatch", post(handlers::dispatch_workflow))
        .route("/api/oauth/token", post(handlers::exchange_token))
        .route("/artifacts/{key}", get(handlers::get_artifact))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
