use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::render::invoker::{ImageRenderer, RenderInvokeError};
use crate::application::storage::{ArtifactUploader, UploadError};
use crate::domain::entities::{Artifact, RenderRequest};
use crate::domain::types::SchedulingKey;

#[derive(Debug, Error)]
pub enum RenderPipelineError {
    #[error(transparent)]
    Invoke(#[from] RenderInvokeError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Render then upload under the scheduling key's artifact key.
#[derive(Clone)]
pub struct RenderPipeline {
    renderer: Arc<dyn ImageRenderer>,
    uploader: ArtifactUploader,
}

impl RenderPipeline {
    pub fn new(renderer: Arc<dyn ImageRenderer>, uploader: ArtifactUploader) -> Self {
        Self { renderer, uploader }
    }

    pub async fn render_and_store(
        &self,
        scheduling_key: &SchedulingKey,
        request: &RenderRequest,
    ) -> Result<Artifact, RenderPipelineError> {
        let image = self.renderer.render(request).await?;
        let artifact = self.uploader.upload(scheduling_key, image.bytes).await?;

        info!(
            target = "application::render::pipeline",
            op = "render_and_store",
            result = "ok",
            scheduling_key = %scheduling_key,
            storage_key = %artifact.storage_key,
            public_url = %artifact.public_url,
            "Rendered artifact stored"
        );

        Ok(artifact)
    }
}
