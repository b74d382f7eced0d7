use std::{future::IntoFuture, process, sync::Arc};

use byline::{
    application::{
        articles::ArticleService, auth::AuthService, error::AppError, users::UserService,
    },
    cache::{CacheClient, CacheConfig},
    config,
    infra::{
        db::PostgresRepositories,
        http::{self, ApiState},
        redis::RedisCacheClient,
        telemetry,
    },
};
use sqlx::postgres::PgPool;
use tokio::sync::watch;
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn connect_database(settings: &config::Settings) -> Result<PgPool, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| AppError::unexpected("database.url is not configured"))?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::unexpected(format!("failed to connect to database: {err}")))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to run migrations: {err}")))?;

    Ok(pool)
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_database(&settings).await?;
    let db = PostgresRepositories::new(pool);

    let cache: Arc<dyn CacheClient> =
        Arc::new(RedisCacheClient::connect(&settings.redis.url, settings.cache.op_timeout_ms).await?);

    let cache_config = CacheConfig::from(&settings.cache);
    let articles_repo = Arc::new(db.clone());
    let users_repo = Arc::new(db.clone());

    let state = ApiState {
        articles: Arc::new(ArticleService::new(
            articles_repo,
            users_repo.clone(),
            cache.clone(),
            cache_config.clone(),
        )),
        users: Arc::new(UserService::new(
            users_repo.clone(),
            cache.clone(),
            cache_config,
        )),
        auth: Arc::new(AuthService::new(
            users_repo,
            &settings.auth.jwt_secret,
            settings.auth.token_expiry_secs,
        )),
        db,
    };

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to bind listener: {err}")))?;

    info!(
        target = "byline::server",
        addr = %settings.server.addr,
        cache_enabled = settings.cache.enabled,
        "listening",
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = drain_rx.changed().await;
        },
    );

    http::await_with_drain_deadline(
        server.into_future(),
        shutdown_rx,
        settings.server.graceful_shutdown,
    )
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_database(&settings).await?;
    info!(target = "byline::migrate", "migrations applied");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown handler");
    }
}
