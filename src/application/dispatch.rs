//! Remote CI workflow dispatch, the fallback path for heavy render batches.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{RepoError, WorkUnitsRepo};
use crate::domain::types::{SchedulingKey, WorkflowDispatchRequest};

pub const METRIC_WORKFLOW_DISPATCH_TOTAL: &str = "pressroom_workflow_dispatch_total";

#[derive(Debug, Error)]
pub enum WorkflowClientError {
    #[error("workflow dispatch is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("workflow endpoint responded with {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("workflow request failed: {0}")]
    Transport(String),
}

/// Fire-and-forget trigger of the remote workflow. `Ok` means accepted, not completed.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    async fn dispatch(&self, key: &SchedulingKey) -> Result<(), WorkflowClientError>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no work units found for `{0}`")]
    NoWorkUnits(SchedulingKey),
    #[error("failed to count work units: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Client(#[from] WorkflowClientError),
}

impl DispatchError {
    fn metric_label(&self) -> &'static str {
        match self {
            DispatchError::NoWorkUnits(_) => "no_work_units",
            DispatchError::Repo(_) => "repo_error",
            DispatchError::Client(WorkflowClientError::NotConfigured(_)) => "not_configured",
            DispatchError::Client(WorkflowClientError::Remote { .. }) => "remote_error",
            DispatchError::Client(WorkflowClientError::Transport(_)) => "transport_error",
        }
    }
}

#[derive(Clone)]
pub struct WorkflowDispatcher {
    units: Arc<dyn WorkUnitsRepo>,
    client: Arc<dyn WorkflowClient>,
}

impl WorkflowDispatcher {
    pub fn new(units: Arc<dyn WorkUnitsRepo>, client: Arc<dyn WorkflowClient>) -> Self {
        Self { units, client }
    }

    /// Trigger the workflow for `key` when it has at least one work unit.
    pub async fn dispatch(
        &self,
        key: &SchedulingKey,
    ) -> Result<WorkflowDispatchRequest, DispatchError> {
        let started_at = Instant::now();
        let result = self.dispatch_inner(key).await;

        match &result {
            Ok(request) => {
                counter!(METRIC_WORKFLOW_DISPATCH_TOTAL, "result" => "accepted").increment(1);
                info!(
                    target = "application::dispatch",
                    op = "workflow::dispatch",
                    result = "accepted",
                    scheduling_key = %key,
                    work_units = request.work_unit_count,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "Workflow dispatch accepted"
                );
            }
            Err(err) => {
                let label = err.metric_label();
                counter!(METRIC_WORKFLOW_DISPATCH_TOTAL, "result" => label).increment(1);
                warn!(
                    target = "application::dispatch",
                    op = "workflow::dispatch",
                    result = "error",
                    error_code = label,
                    scheduling_key = %key,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "Workflow dispatch failed"
                );
            }
        }

        result
    }

    async fn dispatch_inner(
        &self,
        key: &SchedulingKey,
    ) -> Result<WorkflowDispatchRequest, DispatchError> {
        let work_unit_count = self.units.count_work_units(key).await?;
        if work_unit_count == 0 {
            return Err(DispatchError::NoWorkUnits(key.clone()));
        }

        self.client.dispatch(key).await?;

        Ok(WorkflowDispatchRequest {
            scheduling_key: key.clone(),
            work_unit_count,
        })
    }
}
