use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use pressroom::application::dispatch::{WorkflowClient, WorkflowClientError, WorkflowDispatcher};
use pressroom::application::oauth::{IssuedToken, IssuerError, TokenIssuer};
use pressroom::application::render::{ImageRenderer, RenderInvokeError, RenderPipeline};
use pressroom::application::repos::{ContentRepo, RepoError, WorkUnitsRepo};
use pressroom::application::storage::{ArtifactStore, ArtifactUploader};
use pressroom::domain::entities::{ContentItem, RenderRequest, RenderedImage};
use pressroom::domain::types::SchedulingKey;
use pressroom::infra::http::{AppState, build_router};
use pressroom::infra::storage::FilesystemArtifactStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
struct InMemoryContent {
    items: Mutex<BTreeMap<Uuid, ContentItem>>,
}

#[async_trait]
impl ContentRepo for InMemoryContent {
    async fn list_unpublished(&self) -> Result<Vec<ContentItem>, RepoError> {
        Ok(self
            .items
            .lock()
            .await
            .values()
            .filter(|item| !item.is_published)
            .cloned()
            .collect())
    }

    async fn publish_batch(
        &self,
        ids: &[Uuid],
        published_at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let mut items = self.items.lock().await;
        let mut changed = 0;
        for id in ids {
            let Some(item) = items.get_mut(id) else {
                continue;
            };
            if item.is_due(published_at) {
                item.is_published = true;
                item.published_at = Some(published_at);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

struct FixedTracks(HashMap<&'static str, u64>);

#[async_trait]
impl WorkUnitsRepo for FixedTracks {
    async fn count_work_units(&self, key: &SchedulingKey) -> Result<u64, RepoError> {
        Ok(self.0.get(key.as_str()).copied().unwrap_or(0))
    }
}

#[derive(Default)]
struct RecordingWorkflow {
    calls: AtomicUsize,
    reject: bool,
}

#[async_trait]
impl WorkflowClient for RecordingWorkflow {
    async fn dispatch(&self, _key: &SchedulingKey) -> Result<(), WorkflowClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(WorkflowClientError::Remote {
                status: 404,
                body: r#"{"message":"Not Found"}"#.to_string(),
            });
        }
        Ok(())
    }
}

struct StaticRenderer {
    output: Option<&'static [u8]>,
}

#[async_trait]
impl ImageRenderer for StaticRenderer {
    async fn render(&self, _request: &RenderRequest) -> Result<RenderedImage, RenderInvokeError> {
        match self.output {
            Some(bytes) => Ok(RenderedImage {
                bytes: Bytes::from_static(bytes),
                exit_code: Some(0),
            }),
            None => Err(RenderInvokeError::Rejected {
                message: "Failed to load image".to_string(),
                stderr: String::new(),
            }),
        }
    }
}

enum IssuerReply {
    Token,
    NotConfigured,
    Provider,
}

struct StaticIssuer(IssuerReply);

#[async_trait]
impl TokenIssuer for StaticIssuer {
    async fn exchange_code(
        &self,
        _code: &str,
        redirect_uri: &str,
    ) -> Result<IssuedToken, IssuerError> {
        match self.0 {
            IssuerReply::Token => Ok(IssuedToken {
                access_token: format!("token-for-{redirect_uri}"),
                expires_in: Some(5183944),
            }),
            IssuerReply::NotConfigured => Err(IssuerError::NotConfigured),
            IssuerReply::Provider => Err(IssuerError::Provider {
                message: "Invalid verification code format.".to_string(),
                details: None,
            }),
        }
    }
}

struct Harness {
    _dir: TempDir,
    router: Router,
    content: Arc<InMemoryContent>,
    workflow: Arc<RecordingWorkflow>,
    store: Arc<dyn ArtifactStore>,
}

struct Options {
    renderer_output: Option<&'static [u8]>,
    reject_dispatch: bool,
    issuer: IssuerReply,
    default_redirect_uri: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            renderer_output: Some(b"\x89PNG fake"),
            reject_dispatch: false,
            issuer: IssuerReply::Token,
            default_redirect_uri: None,
        }
    }
}

fn harness(options: Options) -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let store: Arc<dyn ArtifactStore> = Arc::new(
        FilesystemArtifactStore::new(dir.path().join("artifacts"), "http://localhost:3000/artifacts")
            .expect("store"),
    );
    let content = Arc::new(InMemoryContent::default());
    let workflow = Arc::new(RecordingWorkflow {
        calls: AtomicUsize::new(0),
        reject: options.reject_dispatch,
    });
    let tracks = Arc::new(FixedTracks(HashMap::from([("2025-11-07", 4)])));

    let state = AppState {
        content: content.clone(),
        render: RenderPipeline::new(
            Arc::new(StaticRenderer {
                output: options.renderer_output,
            }),
            ArtifactUploader::new(store.clone()),
        ),
        dispatcher: WorkflowDispatcher::new(tracks, workflow.clone()),
        issuer: Arc::new(StaticIssuer(options.issuer)),
        default_redirect_uri: options.default_redirect_uri,
        artifacts: Some(store.clone()),
    };

    Harness {
        _dir: dir,
        router: build_router(state),
        content,
        workflow,
        store,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn scheduler_run_reports_null_then_count() {
    let h = harness(Options::default());

    let response = send(&h.router, Method::POST, "/api/scheduler/run", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await, Value::Null);

    {
        let mut items = h.content.items.lock().await;
        for minutes in [5, 10] {
            let id = Uuid::new_v4();
            items.insert(
                id,
                ContentItem {
                    id,
                    payload: json!({ "caption": "weekly cover" }),
                    scheduled_for: Some(OffsetDateTime::now_utc() - Duration::minutes(minutes)),
                    is_published: false,
                    published_at: None,
                },
            );
        }
    }

    let response = send(&h.router, Method::POST, "/api/scheduler/run", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "publishedCount": 2 }));
}

#[tokio::test]
async fn render_requires_image_url_and_week_start() {
    let h = harness(Options::default());

    let response = send(
        &h.router,
        Method::POST,
        "/api/render",
        Some(json!({ "imageUrl": "https://img.test/cover.jpg" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "imageUrl and weekStart are required" })
    );
}

#[tokio::test]
async fn render_rejects_unsafe_week_start() {
    let h = harness(Options::default());

    let response = send(
        &h.router,
        Method::POST,
        "/api/render",
        Some(json!({ "imageUrl": "https://img.test/a.jpg", "weekStart": "../etc" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid weekStart");
}

#[tokio::test]
async fn render_stores_artifact_and_returns_versioned_url() {
    let h = harness(Options::default());

    let response = send(
        &h.router,
        Method::POST,
        "/api/render",
        Some(json!({
            "imageUrl": "https://img.test/cover.jpg",
            "weekStart": "2025-11-07",
            "trackName": "Song"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let url = body["processedImageUrl"].as_str().expect("url");
    assert!(
        url.starts_with("http://localhost:3000/artifacts/2025-11-07_custom_processed.png?v="),
        "unexpected url {url}"
    );

    let stored = h
        .store
        .get("2025-11-07_custom_processed.png")
        .await
        .expect("artifact stored");
    assert_eq!(stored.as_ref(), b"\x89PNG fake");

    let response = send(
        &h.router,
        Method::GET,
        "/artifacts/2025-11-07_custom_processed.png",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=0");
}

#[tokio::test]
async fn render_failure_reports_details() {
    let h = harness(Options {
        renderer_output: None,
        ..Default::default()
    });

    let response = send(
        &h.router,
        Method::POST,
        "/api/render",
        Some(json!({ "imageUrl": "https://img.test/a.jpg", "weekStart": "2025-11-07" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Failed to process image");
    assert!(
        body["details"]
            .as_str()
            .is_some_and(|d| d.contains("Failed to load image"))
    );
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let h = harness(Options::default());

    let response = send(&h.router, Method::GET, "/artifacts/2030-01-01.png", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Artifact not found");
}

#[tokio::test]
async fn dispatch_requires_week_start() {
    let h = harness(Options::default());

    let response = send(&h.router, Method::POST, "/api/workflows/dispatch", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "week_start is required" })
    );
}

#[tokio::test]
async fn dispatch_without_tracks_is_not_found() {
    let h = harness(Options::default());

    let response = send(
        &h.router,
        Method::POST,
        "/api/workflows/dispatch",
        Some(json!({ "week_start": "2025-10-31" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "No tracks found for this week"
    );
    assert_eq!(h.workflow.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dispatch_is_accepted() {
    let h = harness(Options::default());

    let response = send(
        &h.router,
        Method::POST,
        "/api/workflows/dispatch",
        Some(json!({ "week_start": "2025-11-07" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "week_start": "2025-11-07", "tracks_count": 4 })
    );
    assert_eq!(h.workflow.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_dispatch_is_bad_gateway() {
    let h = harness(Options {
        reject_dispatch: true,
        ..Default::default()
    });

    let response = send(
        &h.router,
        Method::POST,
        "/api/workflows/dispatch",
        Some(json!({ "week_start": "2025-11-07" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Failed to trigger workflow");
    assert!(
        body["details"]
            .as_str()
            .is_some_and(|d| d.contains("Not Found"))
    );
}

#[tokio::test]
async fn token_exchange_validates_input() {
    let h = harness(Options::default());

    let response = send(&h.router, Method::POST, "/api/oauth/token", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Authorization code is required"
    );

    let response = send(
        &h.router,
        Method::POST,
        "/api/oauth/token",
        Some(json!({ "code": "abc" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Redirect URI is required");
}

#[tokio::test]
async fn token_exchange_falls_back_to_configured_redirect() {
    let h = harness(Options {
        default_redirect_uri: Some("https://app.example/instagram-callback".to_string()),
        ..Default::default()
    });

    let response = send(
        &h.router,
        Method::POST,
        "/api/oauth/token",
        Some(json!({ "code": "abc" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "access_token": "token-for-https://app.example/instagram-callback",
            "expires_in": 5183944
        })
    );
}

#[tokio::test]
async fn token_exchange_maps_issuer_errors() {
    let h = harness(Options {
        issuer: IssuerReply::NotConfigured,
        ..Default::default()
    });
    let response = send(
        &h.router,
        Method::POST,
        "/api/oauth/token",
        Some(json!({ "code": "abc", "redirectUri": "https://app.example/cb" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "Facebook app credentials not configured"
    );

    let h = harness(Options {
        issuer: IssuerReply::Provider,
        ..Default::default()
    });
    let response = send(
        &h.router,
        Method::POST,
        "/api/oauth/token",
        Some(json!({ "code": "abc", "redirectUri": "https://app.example/cb" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Token exchange failed: Invalid verification code format."
    );
}
