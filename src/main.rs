//! User Dashboard - user management API with event-sourced dashboards
//!
//! Every change to a user is appended to the user's event stream; the
//! dashboard read model is folded from that stream.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_dashboard::api::{self, AppState};
use user_dashboard::event_store::{InMemoryStore, PgUserStore, UserStore};
use user_dashboard::jobs::{JobScheduler, JobSchedulerConfig};
use user_dashboard::projection::{ProjectionLifecycle, ProjectionService};
use user_dashboard::{db, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let projection = ProjectionService::new(config.projection_lifecycle);

    tracing::info!(
        environment = %config.environment,
        lifecycle = %config.projection_lifecycle,
        "Starting user dashboard server"
    );

    match config.database_url.clone() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(&database_url, &config).await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            serve(PgUserStore::new(pool.clone()), projection, &config, addr).await?;

            pool.close().await;
            tracing::info!("Database connections closed. Goodbye!");
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            serve(InMemoryStore::new(), projection, &config, addr).await?;
        }
    }

    Ok(())
}

/// Run the HTTP server (and the catch-up job when projections are deferred)
async fn serve<S>(
    store: S,
    projection: ProjectionService,
    config: &Config,
    addr: SocketAddr,
) -> anyhow::Result<()>
where
    S: UserStore + Clone + 'static,
{
    let scheduler = (projection.lifecycle() == ProjectionLifecycle::Deferred).then(|| {
        let config = JobSchedulerConfig {
            projection_catch_up_interval: config.projection_catch_up_interval,
        };
        JobScheduler::with_config(Arc::new(store.clone()), projection, config).start()
    });

    let app = api::build_router(AppState::new(store, projection));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutting down...");
    if let Some(handle) = scheduler {
        handle.abort();
    }

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
