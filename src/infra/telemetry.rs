use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::{
    dispatch::METRIC_WORKFLOW_DISPATCH_TOTAL,
    oauth::METRIC_OAUTH_HANDSHAKES_TOTAL,
    publish::METRIC_PUBLISH_ITEMS_TOTAL,
    render::{METRIC_RENDER_INVOCATIONS_TOTAL, METRIC_RENDER_MS},
    storage::METRIC_ARTIFACT_UPLOADS_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the pipeline emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_PUBLISH_ITEMS_TOTAL,
            Unit::Count,
            "Total number of content items transitioned to published."
        );
        describe_counter!(
            METRIC_RENDER_INVOCATIONS_TOTAL,
            Unit::Count,
            "Renderer process invocations, labelled by result."
        );
        describe_histogram!(
            METRIC_RENDER_MS,
            Unit::Milliseconds,
            "Renderer invocation latency in milliseconds."
        );
        describe_counter!(
            METRIC_ARTIFACT_UPLOADS_TOTAL,
            Unit::Count,
            "Artifact uploads, labelled by result."
        );
        describe_counter!(
            METRIC_WORKFLOW_DISPATCH_TOTAL,
            Unit::Count,
            "Remote workflow dispatch attempts, labelled by result."
        );
        describe_counter!(
            METRIC_OAUTH_HANDSHAKES_TOTAL,
            Unit::Count,
            "Completed OAuth popup handshakes, labelled by outcome."
        );
    });
}
