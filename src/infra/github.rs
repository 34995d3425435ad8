//! GitHub Actions `workflow_dispatch` client.

use async_trait::async_trait;
use reqwest::{Client, Url, header};
use serde::Serialize;

use crate::application::dispatch::{WorkflowClient, WorkflowClientError};
use crate::domain::types::SchedulingKey;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Clone)]
pub struct GithubWorkflowTarget {
    pub api_base: Url,
    pub owner: String,
    pub repo: String,
    pub workflow: String,
    pub git_ref: String,
}

#[derive(Debug, Clone)]
pub struct GithubWorkflowClient {
    client: Client,
    target: Option<GithubWorkflowTarget>,
    token: Option<String>,
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: DispatchInputs<'a>,
}

#[derive(Serialize)]
struct DispatchInputs<'a> {
    week_start: &'a str,
}

impl GithubWorkflowClient {
    pub fn new(
        client: Client,
        target: Option<GithubWorkflowTarget>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            target,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn user_agent() -> &'static str {
        concat!("pressroom/", env!("CARGO_PKG_VERSION"))
    }

    fn dispatch_url(t: &GithubWorkflowTarget) -> String {
        format!(
            "{}/repos/{}/{}/actions/workflows/{}/dispatches",
            t.api_base.as_str().trim_end_matches('/'),
            t.owner,
            t.repo,
            t.workflow
        )
    }
}

#[async_trait]
impl WorkflowClient for GithubWorkflowClient {
    async fn dispatch(&self, key: &SchedulingKey) -> Result<(), WorkflowClientError> {
        let target = self.target.as_ref().ok_or(WorkflowClientError::NotConfigured(
            "workflow repository not configured",
        ))?;
        let token = self
            .token
            .as_deref()
            .ok_or(WorkflowClientError::NotConfigured("GitHub token not configured"))?;

        let body = DispatchBody {
            git_ref: &target.git_ref,
            inputs: DispatchInputs {
                week_start: key.as_str(),
            },
        };

        let response = self
            .client
            .post(Self::dispatch_url(target))
            .bearer_auth(token)
            .header(header::ACCEPT, ACCEPT_GITHUB_JSON)
            .header(header::USER_AGENT, Self::user_agent())
            .json(&body)
            .send()
            .await
            .map_err(|err| WorkflowClientError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|err| format!("<failed to read response body: {err}>"));
            return Err(WorkflowClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
