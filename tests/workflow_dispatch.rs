mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use httpmock::MockServer;
use pressroom::application::dispatch::{
    DispatchError, WorkflowClient, WorkflowClientError, WorkflowDispatcher,
};
use pressroom::application::repos::{RepoError, WorkUnitsRepo};
use pressroom::domain::types::SchedulingKey;
use pressroom::infra::github::{GithubWorkflowClient, GithubWorkflowTarget};
use reqwest::{Client, Url};
use serde_json::json;
use tokio::sync::Mutex;

#[derive(Default)]
struct InMemoryTracks {
    counts: Mutex<HashMap<String, u64>>,
}

impl InMemoryTracks {
    async fn with(key: &str, count: u64) -> Arc<Self> {
        let repo = Self::default();
        repo.counts.lock().await.insert(key.to_string(), count);
        Arc::new(repo)
    }
}

#[async_trait]
impl WorkUnitsRepo for InMemoryTracks {
    async fn count_work_units(&self, key: &SchedulingKey) -> Result<u64, RepoError> {
        Ok(self
            .counts
            .lock()
            .await
            .get(key.as_str())
            .copied()
            .unwrap_or(0))
    }
}

#[derive(Default)]
struct CountingClient {
    calls: AtomicUsize,
}

#[async_trait]
impl WorkflowClient for CountingClient {
    async fn dispatch(&self, _key: &SchedulingKey) -> Result<(), WorkflowClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn key(raw: &str) -> SchedulingKey {
    SchedulingKey::parse(raw).expect("valid key")
}

fn github_client(server: &MockServer, token: Option<&str>) -> GithubWorkflowClient {
    GithubWorkflowClient::new(
        Client::new(),
        Some(GithubWorkflowTarget {
            api_base: Url::parse(&server.base_url()).expect("base url"),
            owner: "acme".to_string(),
            repo: "covers".to_string(),
            workflow: "instagram-image-generation.yml".to_string(),
            git_ref: "main".to_string(),
        }),
        token.map(str::to_string),
    )
}

#[tokio::test]
async fn zero_work_units_fails_without_remote_call() {
    let tracks = InMemoryTracks::with("2025-11-07", 3).await;
    let client = Arc::new(CountingClient::default());
    let dispatcher = WorkflowDispatcher::new(tracks, client.clone());

    let err = dispatcher
        .dispatch(&key("2025-10-31"))
        .await
        .expect_err("no tracks that week");
    assert!(matches!(err, DispatchError::NoWorkUnits(ref k) if k.as_str() == "2025-10-31"));
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dispatch_reports_work_unit_count() {
    let tracks = InMemoryTracks::with("2025-11-07", 12).await;
    let client = Arc::new(CountingClient::default());
    let dispatcher = WorkflowDispatcher::new(tracks, client.clone());

    let request = dispatcher
        .dispatch(&key("2025-11-07"))
        .await
        .expect("dispatch accepted");
    assert_eq!(request.work_unit_count, 12);
    assert_eq!(request.scheduling_key.as_str(), "2025-11-07");
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn github_client_sends_ref_and_inputs() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/repos/acme/covers/actions/workflows/instagram-image-generation.yml/dispatches")
                .header("authorization", "Bearer gh-token")
                .header("accept", "application/vnd.github+json")
                .json_body(json!({ "ref": "main", "inputs": { "week_start": "2025-11-07" } }));
            then.status(204);
        })
        .await;

    github_client(&server, Some("gh-token"))
        .dispatch(&key("2025-11-07"))
        .await
        .expect("dispatch accepted");
    mock.assert_async().await;
}

#[tokio::test]
async fn github_client_surfaces_error_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST");
            then.status(422)
                .header("content-type", "application/json")
                .body(r#"{"message":"Unexpected inputs provided"}"#);
        })
        .await;

    let err = github_client(&server, Some("gh-token"))
        .dispatch(&key("2025-11-07"))
        .await
        .expect_err("rejected dispatch");
    match err {
        WorkflowClientError::Remote { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("Unexpected inputs provided"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_token_is_not_configured() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("POST");
            then.status(204);
        })
        .await;

    let err = github_client(&server, None)
        .dispatch(&key("2025-11-07"))
        .await
        .expect_err("token required");
    assert!(matches!(err, WorkflowClientError::NotConfigured(_)));
    assert_eq!(mock.calls_async().await, 0);
}

#[tokio::test]
async fn github_client_reports_unreadable_error_body() {
    let base = common::truncated_body_server(502);
    let client = GithubWorkflowClient::new(
        Client::new(),
        Some(GithubWorkflowTarget {
            api_base: Url::parse(&base).expect("base url"),
            owner: "acme".to_string(),
            repo: "covers".to_string(),
            workflow: "instagram-image-generation.yml".to_string(),
            git_ref: "main".to_string(),
        }),
        Some("gh-token".to_string()),
    );

    let err = client
        .dispatch(&key("2025-11-07"))
        .await
        .expect_err("gateway error");
    match err {
        WorkflowClientError::Remote { status, body } => {
            assert_eq!(status, 502);
            assert!(
                body.starts_with("<failed to read response body:"),
                "body: {body}"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
