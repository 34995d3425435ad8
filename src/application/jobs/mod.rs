mod context;
mod publish;

pub use context::{PublishJobContext, job_failed};
pub use publish::{
    DEFAULT_PUBLISH_CRON, PublishDueContentJob, process_publish_due_job, publish_due_schedule,
};
