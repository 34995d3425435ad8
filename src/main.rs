use std::{process, sync::Arc};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use pressroom::{
    application::{
        dispatch::{WorkflowClient, WorkflowDispatcher},
        error::AppError,
        jobs::{PublishJobContext, process_publish_due_job, publish_due_schedule},
        oauth::{OAuthCoordinator, TokenExchanger, TokenIssuer},
        publish::publish_due,
        render::{ImageRenderer, RenderInvoker, RenderInvokerConfig, RenderPipeline},
        repos::{ContentRepo, WorkUnitsRepo},
        storage::{ArtifactStore, ArtifactUploader},
    },
    config,
    domain::{entities::RenderRequest, types::SchedulingKey},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        exchange::HttpTokenExchanger,
        github::{GithubWorkflowClient, GithubWorkflowTarget},
        graph::GraphTokenClient,
        http::{self, AppState},
        storage::{FilesystemArtifactStore, RemoteArtifactStore},
        telemetry,
    },
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::PublishDue(_) => run_publish_due(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Dispatch(args) => run_dispatch(settings, args).await,
        config::Command::Authorize(args) => run_authorize(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let client = build_http_client()?;
    let (store, served_artifacts) = build_artifact_store(&settings, &client)?;

    let content: Arc<dyn ContentRepo> = repositories.clone();
    let units: Arc<dyn WorkUnitsRepo> = repositories;
    let issuer: Arc<dyn TokenIssuer> = Arc::new(GraphTokenClient::new(
        client.clone(),
        settings.oauth.graph_base.clone(),
        settings.oauth.app_id.clone(),
        settings.oauth.app_secret.clone(),
    ));

    let state = AppState {
        content: content.clone(),
        render: build_render_pipeline(&settings, store),
        dispatcher: build_dispatcher(&settings, units, &client),
        issuer,
        default_redirect_uri: settings.oauth.redirect_uri.clone(),
        artifacts: served_artifacts,
    };

    let monitor_handle = spawn_job_monitor(PublishJobContext { content }, &settings.scheduler)?;

    let result = serve_http(&settings, state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

async fn run_publish_due(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    match publish_due(repositories.as_ref(), OffsetDateTime::now_utc()).await? {
        Some(summary) => info!(
            target = "pressroom::publish_due",
            published_count = summary.published_count,
            "Published due content"
        ),
        None => info!(target = "pressroom::publish_due", "Nothing due"),
    }
    Ok(())
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let key = SchedulingKey::parse(args.week_start)?;
    let client = build_http_client()?;
    let (store, _) = build_artifact_store(&settings, &client)?;
    let pipeline = build_render_pipeline(&settings, store);

    let request = RenderRequest::new(args.image_url, args.track, args.artist);
    let artifact = pipeline.render_and_store(&key, &request).await?;

    info!(
        target = "pressroom::render",
        scheduling_key = %key,
        storage_key = %artifact.storage_key,
        checksum = %artifact.checksum,
        processed_image_url = %artifact.versioned_url(OffsetDateTime::now_utc()),
        "Artifact rendered"
    );
    Ok(())
}

async fn run_dispatch(
    settings: config::Settings,
    args: config::DispatchArgs,
) -> Result<(), AppError> {
    let key = SchedulingKey::parse(args.week_start)?;
    let repositories = init_repositories(&settings).await?;
    let client = build_http_client()?;
    let dispatcher = build_dispatcher(&settings, repositories, &client);

    let request = dispatcher.dispatch(&key).await?;
    info!(
        target = "pressroom::dispatch",
        scheduling_key = %request.scheduling_key,
        work_units = request.work_unit_count,
        "Workflow dispatch accepted"
    );
    Ok(())
}

async fn run_authorize(
    settings: config::Settings,
    args: config::AuthorizeArgs,
) -> Result<(), AppError> {
    let location = args.redirect_url;
    let origin = location.origin();
    if !origin.is_tuple() {
        return Err(AppError::unexpected(format!(
            "redirect url has no origin: {location}"
        )));
    }
    let opener_origin = args
        .opener_origin
        .unwrap_or_else(|| origin.ascii_serialization());

    let client = build_http_client()?;
    let exchanger: Arc<dyn TokenExchanger> =
        Arc::new(HttpTokenExchanger::new(client, location.clone()));
    let coordinator = OAuthCoordinator::new(exchanger, settings.oauth.exchange_timeout);

    let access_token = coordinator
        .complete_in_popup(opener_origin, location, settings.oauth.session_timeout)
        .await?;

    info!(target = "pressroom::authorize", "Access token obtained");
    println!("{access_token}");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(GithubWorkflowClient::user_agent())
        .build()
        .map_err(|err| AppError::from(InfraError::HttpClient(err.to_string())))
}

/// The store used for uploads, plus the same store when it should be served under `/artifacts`.
fn build_artifact_store(
    settings: &config::Settings,
    client: &reqwest::Client,
) -> Result<(Arc<dyn ArtifactStore>, Option<Arc<dyn ArtifactStore>>), AppError> {
    match &settings.storage {
        config::StorageSettings::Filesystem {
            root,
            public_base_url,
        } => {
            let store: Arc<dyn ArtifactStore> = Arc::new(
                FilesystemArtifactStore::new(root.clone(), public_base_url.clone())
                    .map_err(InfraError::from)?,
            );
            Ok((store.clone(), Some(store)))
        }
        config::StorageSettings::Remote {
            base_url,
            bucket,
            api_key,
        } => {
            let store: Arc<dyn ArtifactStore> = Arc::new(RemoteArtifactStore::new(
                client.clone(),
                base_url.clone(),
                bucket.clone(),
                api_key.clone(),
            ));
            Ok((store, None))
        }
    }
}

fn build_render_pipeline(
    settings: &config::Settings,
    store: Arc<dyn ArtifactStore>,
) -> RenderPipeline {
    let render = &settings.render;
    let invoker: Arc<dyn ImageRenderer> = Arc::new(RenderInvoker::new(RenderInvokerConfig {
        program: render.program.clone(),
        args: render.args.clone(),
        max_output_bytes: render.max_output_bytes,
        timeout: render.timeout,
    }));
    RenderPipeline::new(invoker, ArtifactUploader::new(store))
}

fn build_dispatcher(
    settings: &config::Settings,
    units: Arc<dyn WorkUnitsRepo>,
    client: &reqwest::Client,
) -> WorkflowDispatcher {
    let workflow = &settings.workflow;
    let target = workflow
        .repository
        .as_ref()
        .map(|(owner, repo)| GithubWorkflowTarget {
            api_base: workflow.api_base.clone(),
            owner: owner.clone(),
            repo: repo.clone(),
            workflow: workflow.workflow.clone(),
            git_ref: workflow.git_ref.clone(),
        });
    let client: Arc<dyn WorkflowClient> = Arc::new(GithubWorkflowClient::new(
        client.clone(),
        target,
        workflow.token.clone(),
    ));
    WorkflowDispatcher::new(units, client)
}

fn spawn_job_monitor(
    context: PublishJobContext,
    scheduler: &config::SchedulerSettings,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = publish_due_schedule(&scheduler.cron)
        .map_err(|reason| InfraError::configuration(format!("scheduler.cron: {reason}")))?;

    let publish_worker = WorkerBuilder::new("publish-due-worker")
        .concurrency(1)
        .data(context)
        .backend(CronStream::new(schedule))
        .build_fn(process_publish_due_job);

    let monitor = Monitor::new().register(publish_worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = "pressroom::serve",
        addr = %settings.server.addr,
        "HTTP listener bound"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}
