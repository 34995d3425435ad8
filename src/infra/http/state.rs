use std::sync::Arc;

use crate::application::dispatch::WorkflowDispatcher;
use crate::application::oauth::TokenIssuer;
use crate::application::render::RenderPipeline;
use crate::application::repos::ContentRepo;
use crate::application::storage::ArtifactStore;

#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentRepo>,
    pub render: RenderPipeline,
    pub dispatcher: WorkflowDispatcher,
    pub issuer: Arc<dyn TokenIssuer>,
    /// Redirect URI used when a token exchange request omits `redirectUri`.
    pub default_redirect_uri: Option<String>,
    /// Store served under `/artifacts`; only set for the filesystem backend.
    pub artifacts: Option<Arc<dyn ArtifactStore>>,
}
