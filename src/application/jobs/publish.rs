//! Cron trigger for the scheduled batch publisher.

use std::str::FromStr;

use apalis::prelude::*;
use apalis_cron::Schedule;
use time::OffsetDateTime;

use crate::application::jobs::context::{PublishJobContext, job_failed};
use crate::application::publish::publish_due;

/// Every minute, on the minute.
pub const DEFAULT_PUBLISH_CRON: &str = "0 * * * * *";

/// Tick emitted by the cron stream. Carries the scheduled tick time for logging only.
#[derive(Default, Debug, Clone)]
pub struct PublishDueContentJob {
    pub tick: chrono::DateTime<chrono::Utc>,
}

impl From<chrono::DateTime<chrono::Utc>> for PublishDueContentJob {
    fn from(tick: chrono::DateTime<chrono::Utc>) -> Self {
        Self { tick }
    }
}

/// Run the publisher once against the current UTC time.
pub async fn process_publish_due_job(
    job: PublishDueContentJob,
    ctx: Data<PublishJobContext>,
) -> Result<(), apalis::prelude::Error> {
    match publish_due(ctx.content.as_ref(), OffsetDateTime::now_utc()).await {
        Ok(Some(summary)) => {
            tracing::info!(
                target = "application::jobs::publish",
                tick = %job.tick,
                published_count = summary.published_count,
                "Scheduled publish run completed"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            tracing::warn!(
                target = "application::jobs::publish",
                tick = %job.tick,
                error = %err,
                "Scheduled publish run failed"
            );
            Err(job_failed(err))
        }
    }
}

/// Parse a six-field cron expression (seconds first), returning the parser's reason on failure.
pub fn publish_due_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| err.to_string())
}
