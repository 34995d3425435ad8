use std::sync::Arc;

use apalis::prelude::Error as ApalisError;

use crate::application::repos::ContentRepo;

/// Shared context handed to the publish worker.
#[derive(Clone)]
pub struct PublishJobContext {
    pub content: Arc<dyn ContentRepo>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convert any error into an [`ApalisError::Failed`].
pub fn job_failed<E>(err: E) -> ApalisError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let boxed: BoxError = Box::new(err);
    ApalisError::Failed(Arc::new(boxed))
}
