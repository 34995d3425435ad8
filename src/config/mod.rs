//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::jobs::{DEFAULT_PUBLISH_CRON, publish_due_schedule};
use crate::application::oauth::{DEFAULT_EXCHANGE_TIMEOUT, DEFAULT_SESSION_TIMEOUT};
use crate::application::render::{DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_RENDER_TIMEOUT};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pressroom";
const ENV_PREFIX: &str = "PRESSROOM";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_RENDER_PROGRAM: &str = "pressroom-render";
const DEFAULT_STORAGE_ROOT: &str = "artifacts";
const DEFAULT_PUBLIC_BASE_URL: &str = "/artifacts";
const DEFAULT_STORAGE_BUCKET: &str = "instagram-images";
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const DEFAULT_WORKFLOW_FILE: &str = "instagram-image-generation.yml";
const DEFAULT_WORKFLOW_REF: &str = "main";
const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com/v18.0";

/// Command-line arguments for the pressroom binary.
#[derive(Debug, Parser)]
#[command(
    name = "pressroom",
    version,
    about = "Publishing orchestration for scheduled content and rendered artifacts"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PRESSROOM_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API and the publish scheduler.
    Serve(Box<ServeArgs>),
    /// Publish every content item that is due, once.
    #[command(name = "publish-due")]
    PublishDue(PublishDueArgs),
    /// Render a cover image and store it under the week's artifact key.
    Render(RenderArgs),
    /// Trigger the remote image workflow for a week.
    Dispatch(DispatchArgs),
    /// Complete an OAuth handshake from the provider's redirect URL and print the token.
    Authorize(AuthorizeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the renderer executable.
    #[arg(long = "render-program", value_name = "PATH", value_hint = ValueHint::ExecutablePath)]
    pub render_program: Option<PathBuf>,

    /// Override the renderer timeout.
    #[arg(long = "render-timeout-seconds", value_name = "SECONDS")]
    pub render_timeout_seconds: Option<u64>,

    /// Override the maximum renderer stdout size in bytes.
    #[arg(long = "render-max-output-bytes", value_name = "BYTES")]
    pub render_max_output_bytes: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the filesystem artifact directory.
    #[arg(long = "storage-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub storage_root: Option<PathBuf>,

    /// Override the public base URL of filesystem artifacts.
    #[arg(long = "storage-public-base-url", value_name = "URL")]
    pub storage_public_base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the publish scheduler cron expression.
    #[arg(long = "scheduler-cron", value_name = "CRON")]
    pub scheduler_cron: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PublishDueArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Week the artifact belongs to, e.g. 2025-11-07.
    #[arg(long = "week-start", value_name = "KEY")]
    pub week_start: String,

    /// Source image URL handed to the renderer.
    #[arg(long = "image-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub image_url: String,

    /// Track label; defaults to "Custom Image".
    #[arg(long = "track", value_name = "NAME")]
    pub track: Option<String>,

    /// Artist label; defaults to "Custom".
    #[arg(long = "artist", value_name = "NAME")]
    pub artist: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct DispatchArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Week whose tracks the workflow should render.
    #[arg(long = "week-start", value_name = "KEY")]
    pub week_start: String,
}

#[derive(Debug, Args, Clone)]
pub struct AuthorizeArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Redirect URL the provider sent the browser to, including its query.
    #[arg(long = "redirect-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub redirect_url: Url,

    /// Origin of the opening window; defaults to the redirect URL's origin.
    #[arg(long = "opener-origin", value_name = "ORIGIN")]
    pub opener_origin: Option<String>,

    /// Override the token exchange timeout.
    #[arg(long = "exchange-timeout-seconds", value_name = "SECONDS")]
    pub exchange_timeout_seconds: Option<u64>,

    /// Override how long to wait for the handshake verdict.
    #[arg(long = "session-timeout-seconds", value_name = "SECONDS")]
    pub session_timeout_seconds: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub scheduler: SchedulerSettings,
    pub render: RenderSettings,
    pub storage: StorageSettings,
    pub workflow: WorkflowSettings,
    pub oauth: OAuthSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub cron: String,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub max_output_bytes: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum StorageSettings {
    Filesystem {
        root: PathBuf,
        public_base_url: String,
    },
    Remote {
        base_url: Url,
        bucket: String,
        api_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub api_base: Url,
    /// `(owner, repo)`; dispatch reports "not configured" while unset.
    pub repository: Option<(String, String)>,
    pub workflow: String,
    pub git_ref: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub graph_base: Url,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub exchange_timeout: Duration,
    pub session_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_layers(cli, Environment::with_prefix(ENV_PREFIX).separator("__"))
}

fn load_layers(cli: &CliArgs, environment: Environment) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment);

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_command_overrides(cli.command.as_ref());

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    scheduler: RawSchedulerSettings,
    render: RawRenderSettings,
    storage: RawStorageSettings,
    workflow: RawWorkflowSettings,
    oauth: RawOAuthSettings,
}

impl RawSettings {
    fn apply_command_overrides(&mut self, command: Option<&Command>) {
        match command {
            Some(Command::Serve(args)) => self.apply_serve_overrides(&args.overrides),
            Some(Command::PublishDue(args)) => {
                self.apply_database_override(&args.database);
                self.apply_logging_overrides(&args.logging);
            }
            Some(Command::Render(args)) => {
                self.apply_logging_overrides(&args.logging);
                self.apply_render_overrides(&args.render);
                self.apply_storage_overrides(&args.storage);
            }
            Some(Command::Dispatch(args)) => {
                self.apply_database_override(&args.database);
                self.apply_logging_overrides(&args.logging);
            }
            Some(Command::Authorize(args)) => {
                self.apply_logging_overrides(&args.logging);
                if let Some(seconds) = args.exchange_timeout_seconds {
                    self.oauth.exchange_timeout_seconds = Some(seconds);
                }
                if let Some(seconds) = args.session_timeout_seconds {
                    self.oauth.session_timeout_seconds = Some(seconds);
                }
            }
            None => self.apply_serve_overrides(&ServeOverrides::default()),
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(cron) = overrides.scheduler_cron.as_ref() {
            self.scheduler.cron = Some(cron.clone());
        }

        self.apply_database_override(&overrides.database);
        self.apply_logging_overrides(&overrides.logging);
        self.apply_render_overrides(&overrides.render);
        self.apply_storage_overrides(&overrides.storage);
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(program) = overrides.render_program.as_ref() {
            self.render.program = Some(program.clone());
        }
        if let Some(seconds) = overrides.render_timeout_seconds {
            self.render.timeout_seconds = Some(seconds);
        }
        if let Some(bytes) = overrides.render_max_output_bytes {
            self.render.max_output_bytes = Some(bytes);
        }
    }

    fn apply_storage_overrides(&mut self, overrides: &StorageOverrides) {
        if let Some(root) = overrides.storage_root.as_ref() {
            self.storage.root = Some(root.clone());
        }
        if let Some(base) = overrides.storage_public_base_url.as_ref() {
            self.storage.public_base_url = Some(base.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            scheduler,
            render,
            storage,
            workflow,
            oauth,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            scheduler: build_scheduler_settings(scheduler)?,
            render: build_render_settings(render)?,
            storage: build_storage_settings(storage)?,
            workflow: build_workflow_settings(workflow)?,
            oauth: build_oauth_settings(oauth)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections: non_zero_u32(max.into(), "database.max_connections")?,
    })
}

fn build_scheduler_settings(
    scheduler: RawSchedulerSettings,
) -> Result<SchedulerSettings, LoadError> {
    let cron = non_blank(scheduler.cron).unwrap_or_else(|| DEFAULT_PUBLISH_CRON.to_string());
    publish_due_schedule(&cron).map_err(|reason| LoadError::invalid("scheduler.cron", reason))?;
    Ok(SchedulerSettings { cron })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let program = render
        .program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_PROGRAM));
    if program.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.program",
            "path must not be empty",
        ));
    }

    let max_output_bytes = match render.max_output_bytes {
        Some(value) => {
            let value = non_zero_u64(value, "render.max_output_bytes")?;
            usize::try_from(value).map_err(|_| {
                LoadError::invalid(
                    "render.max_output_bytes",
                    "value exceeds supported range for usize",
                )
            })?
        }
        None => DEFAULT_MAX_OUTPUT_BYTES,
    };

    let timeout = match render.timeout_seconds {
        Some(seconds) => Duration::from_secs(non_zero_u64(seconds, "render.timeout_seconds")?),
        None => DEFAULT_RENDER_TIMEOUT,
    };

    Ok(RenderSettings {
        program,
        args: render.args.unwrap_or_default(),
        max_output_bytes,
        timeout,
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let backend = non_blank(storage.backend).unwrap_or_else(|| "filesystem".to_string());
    match backend.to_ascii_lowercase().as_str() {
        "filesystem" => {
            let root = storage
                .root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT));
            if root.as_os_str().is_empty() {
                return Err(LoadError::invalid("storage.root", "path must not be empty"));
            }
            let public_base_url = non_blank(storage.public_base_url)
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
            Ok(StorageSettings::Filesystem {
                root,
                public_base_url,
            })
        }
        "remote" => {
            let base_url = non_blank(storage.base_url)
                .ok_or_else(|| LoadError::invalid("storage.base_url", "required for remote"))?;
            let base_url = parse_url(&base_url, "storage.base_url")?;
            let api_key = non_blank(storage.api_key)
                .ok_or_else(|| LoadError::invalid("storage.api_key", "required for remote"))?;
            let bucket =
                non_blank(storage.bucket).unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string());
            Ok(StorageSettings::Remote {
                base_url,
                bucket,
                api_key,
            })
        }
        other => Err(LoadError::invalid(
            "storage.backend",
            format!("unknown backend `{other}` (expected filesystem or remote)"),
        )),
    }
}

fn build_workflow_settings(workflow: RawWorkflowSettings) -> Result<WorkflowSettings, LoadError> {
    let api_base = non_blank(workflow.api_base)
        .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string());
    let api_base = parse_url(&api_base, "workflow.api_base")?;

    let repository = match (non_blank(workflow.owner), non_blank(workflow.repo)) {
        (Some(owner), Some(repo)) => Some((owner, repo)),
        (None, None) => None,
        _ => {
            return Err(LoadError::invalid(
                "workflow.repo",
                "owner and repo must be set together",
            ));
        }
    };

    Ok(WorkflowSettings {
        api_base,
        repository,
        workflow: non_blank(workflow.workflow).unwrap_or_else(|| DEFAULT_WORKFLOW_FILE.to_string()),
        git_ref: non_blank(workflow.git_ref).unwrap_or_else(|| DEFAULT_WORKFLOW_REF.to_string()),
        token: non_blank(workflow.token),
    })
}

fn build_oauth_settings(oauth: RawOAuthSettings) -> Result<OAuthSettings, LoadError> {
    let graph_base =
        non_blank(oauth.graph_base).unwrap_or_else(|| DEFAULT_GRAPH_BASE.to_string());
    let graph_base = parse_url(&graph_base, "oauth.graph_base")?;

    let exchange_timeout = match oauth.exchange_timeout_seconds {
        Some(seconds) => Duration::from_secs(non_zero_u64(
            seconds,
            "oauth.exchange_timeout_seconds",
        )?),
        None => DEFAULT_EXCHANGE_TIMEOUT,
    };
    let session_timeout = match oauth.session_timeout_seconds {
        Some(seconds) => Duration::from_secs(non_zero_u64(
            seconds,
            "oauth.session_timeout_seconds",
        )?),
        None => DEFAULT_SESSION_TIMEOUT,
    };

    Ok(OAuthSettings {
        graph_base,
        app_id: non_blank(oauth.app_id),
        app_secret: non_blank(oauth.app_secret),
        redirect_uri: non_blank(oauth.redirect_uri),
        exchange_timeout,
        session_timeout,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSchedulerSettings {
    cron: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    program: Option<PathBuf>,
    args: Option<Vec<String>>,
    max_output_bytes: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    backend: Option<String>,
    root: Option<PathBuf>,
    public_base_url: Option<String>,
    base_url: Option<String>,
    bucket: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWorkflowSettings {
    api_base: Option<String>,
    owner: Option<String>,
    repo: Option<String>,
    workflow: Option<String>,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOAuthSettings {
    graph_base: Option<String>,
    app_id: Option<String>,
    app_secret: Option<String>,
    redirect_uri: Option<String>,
    exchange_timeout_seconds: Option<u64>,
    session_timeout_seconds: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(value).map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<u64, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = non_zero_u64(value, key)?
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
