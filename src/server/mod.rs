use crate::config::Config;
use crate::login::LoginService;
use crate::mail::Mailer;
use crate::uploads::{sweep_stale_temp_files, LogoStorage, RemoteFetcher, UploadService};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use synedrius_db::pool::DbPool;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod routes_login;
pub mod routes_pages;
pub mod routes_teams;
pub mod routes_uploads;

/// How often expired codes and sessions are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: DbPool,
    pub mailer: Arc<dyn Mailer>,
    pub login: Arc<LoginService>,
    pub login_limits: rate_limit::LoginLimits,
    pub uploads: Arc<UploadService>,
}

impl AppContext {
    /// Wire services from config. The session secret must already be set.
    pub fn new(config: Config, db: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let fetcher = RemoteFetcher::new(
            Duration::from_secs(config.storage.fetch_timeout_secs),
            config.storage.max_upload_bytes,
        )
        .context("Failed to create remote image client")?;

        let uploads = UploadService::new(
            db.clone(),
            LogoStorage::new(config.storage.uploads_dir.clone()),
            fetcher,
            config.storage.max_upload_bytes,
        );
        let login = LoginService::new(db.clone(), mailer.clone(), &config);
        let login_limits = rate_limit::LoginLimits::new(
            config.auth.code_requests_per_minute,
            config.auth.verify_requests_per_minute,
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            mailer,
            login: Arc::new(login),
            login_limits,
            uploads: Arc::new(uploads),
        })
    }

    /// Create the uploads and temp directories.
    pub fn prepare_storage(&self) -> Result<()> {
        self.uploads
            .storage()
            .ensure_dir()
            .with_context(|| format!("Failed to create uploads dir {:?}", self.config.storage.uploads_dir))?;
        std::fs::create_dir_all(&self.config.storage.tmp_dir)
            .with_context(|| format!("Failed to create temp dir {:?}", self.config.storage.tmp_dir))?;
        Ok(())
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let protected_routes = routes_uploads::upload_routes(&ctx)
        .merge(routes_teams::team_routes())
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_session,
        ));

    let uploads_dir = ctx.config.storage.uploads_dir.clone();
    let public_dir = ctx.config.server.public_dir.clone();

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(routes_pages::page_routes())
        .merge(routes_login::login_routes())
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .fallback_service(ServeDir::new(public_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Periodically drop expired login codes, sessions and rate limit keys.
pub fn start_purge_task(ctx: AppContext, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match ctx.login.purge_expired() {
                Ok((0, 0)) => {}
                Ok((codes, sessions)) => {
                    tracing::debug!("Purged {} expired codes and {} expired sessions", codes, sessions)
                }
                Err(e) => tracing::warn!("Failed to purge expired logins: {}", e),
            }
            ctx.login_limits.shrink();
        }
    })
}

/// Start the HTTP server
pub async fn start_server(config: Config, db: DbPool, mailer: Arc<dyn Mailer>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config, db, mailer)?;
    ctx.prepare_storage()?;

    let swept = sweep_stale_temp_files(&ctx.config.storage.tmp_dir);
    if swept > 0 {
        tracing::info!("Removed {} stale temp uploads", swept);
    }

    let purge_handle = start_purge_task(ctx.clone(), PURGE_INTERVAL);

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_handle.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
