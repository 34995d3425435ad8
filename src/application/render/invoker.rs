//! One-shot invocation of the external image renderer over stdin/stdout.

use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use metrics::{counter, histogram};
use serde::Deserialize;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, Command},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::domain::entities::{RenderRequest, RenderedImage};

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 32 * 1024 * 1024;
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);
pub const STDERR_CAPTURE_LIMIT: usize = 64 * 1024;

pub const METRIC_RENDER_INVOCATIONS_TOTAL: &str = "pressroom_render_invocations_total";
pub const METRIC_RENDER_MS: &str = "pressroom_render_ms";

#[derive(Debug, Error)]
pub enum RenderInvokeError {
    #[error("renderer executable unavailable: {0}")]
    NotFound(#[source] io::Error),
    #[error("failed to spawn renderer: {0}")]
    Spawn(#[source] io::Error),
    #[error("renderer pipe failed: {0}")]
    Io(#[source] io::Error),
    #[error("failed to encode render request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("renderer exited with status {exit_code:?}: {stderr}")]
    Exit {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("renderer produced no output (exit {exit_code:?}): {stderr}")]
    EmptyOutput {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("renderer output malformed: {reason} (exit {exit_code:?}): {stderr}")]
    MalformedOutput {
        reason: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("renderer rejected the request: {message}")]
    Rejected { message: String, stderr: String },
    #[error("renderer output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize, stderr: String },
    #[error("renderer timed out after {0:?}")]
    Timeout(Duration),
}

impl RenderInvokeError {
    fn metric_label(&self) -> &'static str {
        match self {
            RenderInvokeError::NotFound(_) => "not_found",
            RenderInvokeError::Spawn(_) => "spawn_error",
            RenderInvokeError::Io(_) | RenderInvokeError::Encode(_) => "io_error",
            RenderInvokeError::Exit { .. } => "exit_error",
            RenderInvokeError::EmptyOutput { .. } => "empty_output",
            RenderInvokeError::MalformedOutput { .. } => "malformed_output",
            RenderInvokeError::Rejected { .. } => "rejected",
            RenderInvokeError::OutputTooLarge { .. } => "output_too_large",
            RenderInvokeError::Timeout(_) => "timeout",
        }
    }
}

/// Anything able to turn a render request into image bytes.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage, RenderInvokeError>;
}

#[derive(Debug, Clone)]
pub struct RenderInvokerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub max_output_bytes: usize,
    pub timeout: Duration,
}

impl RenderInvokerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RendererResponse {
    success: bool,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Spawns the renderer once per call; no state is shared between calls.
#[derive(Debug, Clone)]
pub struct RenderInvoker {
    config: RenderInvokerConfig,
}

impl RenderInvoker {
    pub fn new(config: RenderInvokerConfig) -> Self {
        Self { config }
    }

    pub async fn invoke(&self, request: &RenderRequest) -> Result<RenderedImage, RenderInvokeError> {
        let started_at = Instant::now();
        let result = self.invoke_inner(request).await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        histogram!(METRIC_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(image) => {
                counter!(METRIC_RENDER_INVOCATIONS_TOTAL, "result" => "ok").increment(1);
                info!(
                    target = "application::render::invoker",
                    op = "render::invoke",
                    result = "ok",
                    elapsed_ms,
                    program = %self.config.program.display(),
                    image_bytes = image.bytes.len(),
                    "Renderer produced image"
                );
            }
            Err(err) => {
                let label = err.metric_label();
                counter!(METRIC_RENDER_INVOCATIONS_TOTAL, "result" => label).increment(1);
                warn!(
                    target = "application::render::invoker",
                    op = "render::invoke",
                    result = "error",
                    elapsed_ms,
                    program = %self.config.program.display(),
                    error_code = label,
                    error = %err,
                    "Renderer invocation failed"
                );
            }
        }

        result
    }

    async fn invoke_inner(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderedImage, RenderInvokeError> {
        let input = serde_json::to_vec(request).map_err(RenderInvokeError::Encode)?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    RenderInvokeError::NotFound(err)
                } else {
                    RenderInvokeError::Spawn(err)
                }
            })?;

        let exchange = exchange(&mut child, input, self.config.max_output_bytes);
        match tokio::time::timeout(self.config.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                let _ = child.kill().await;
                Err(RenderInvokeError::Timeout(self.config.timeout))
            }
        }
    }
}

#[async_trait]
impl ImageRenderer for RenderInvoker {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedImage, RenderInvokeError> {
        self.invoke(request).await
    }
}

async fn exchange(
    child: &mut Child,
    input: Vec<u8>,
    limit: usize,
) -> Result<RenderedImage, RenderInvokeError> {
    let writer = child.stdin.take().map(|mut stdin| {
        tokio::spawn(async move {
            ignore_broken_pipe(stdin.write_all(&input).await)?;
            ignore_broken_pipe(stdin.shutdown().await)
        })
    });
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(read_capped(stderr, STDERR_CAPTURE_LIMIT)));
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| RenderInvokeError::Io(io::Error::other("renderer stdout not captured")))?;

    let mut output = Vec::new();
    (&mut stdout)
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut output)
        .await
        .map_err(RenderInvokeError::Io)?;

    if output.len() > limit {
        let _ = child.kill().await;
        let stderr = collect_stderr(stderr_task).await;
        return Err(RenderInvokeError::OutputTooLarge { limit, stderr });
    }

    let status = child.wait().await.map_err(RenderInvokeError::Io)?;
    let stderr = collect_stderr(stderr_task).await;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(RenderInvokeError::Io(err)),
            Err(join) => return Err(RenderInvokeError::Io(io::Error::other(join))),
        }
    }

    let exit_code = status.code();
    if !status.success() {
        return Err(RenderInvokeError::Exit { exit_code, stderr });
    }

    parse_output(&output, exit_code, stderr)
}

fn parse_output(
    output: &[u8],
    exit_code: Option<i32>,
    stderr: String,
) -> Result<RenderedImage, RenderInvokeError> {
    if output.iter().all(u8::is_ascii_whitespace) {
        return Err(RenderInvokeError::EmptyOutput { exit_code, stderr });
    }

    let response: RendererResponse = match serde_json::from_slice(output) {
        Ok(response) => response,
        Err(err) => {
            return Err(RenderInvokeError::MalformedOutput {
                reason: format!("invalid JSON: {err}"),
                exit_code,
                stderr,
            });
        }
    };

    if !response.success {
        let message = response
            .error
            .unwrap_or_else(|| "renderer reported failure without a message".to_string());
        return Err(RenderInvokeError::Rejected { message, stderr });
    }

    let Some(encoded) = response.image else {
        return Err(RenderInvokeError::MalformedOutput {
            reason: "success without image".to_string(),
            exit_code,
            stderr,
        });
    };

    let decoded = match STANDARD.decode(encoded.trim()) {
        Ok(decoded) => decoded,
        Err(err) => {
            return Err(RenderInvokeError::MalformedOutput {
                reason: format!("image is not valid base64: {err}"),
                exit_code,
                stderr,
            });
        }
    };

    if decoded.is_empty() {
        return Err(RenderInvokeError::MalformedOutput {
            reason: "image decoded to zero bytes".to_string(),
            exit_code,
            stderr,
        });
    }

    Ok(RenderedImage {
        bytes: Bytes::from(decoded),
        exit_code,
    })
}

fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Drain `reader` to EOF, keeping at most `limit` bytes.
async fn read_capped<R>(mut reader: R, limit: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(read) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..read.min(room)]);
            }
        }
    }
    kept
}

async fn collect_stderr(task: Option<JoinHandle<Vec<u8>>>) -> String {
    match task {
        Some(handle) => match handle.await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        },
        None => String::new(),
    }
}
