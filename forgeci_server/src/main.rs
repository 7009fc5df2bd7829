//! ForgeCI server — standalone binary wiring the Postgres-backed store,
//! backend clients, dispatcher, and HTTP surface together.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

use forgeci_server::backends::{CoprHttp, KojiHttp, TestingFarmHttp};
use forgeci_server::config::ServiceConfig;
use forgeci_server::dispatcher::Dispatcher;
use forgeci_server::forge::GithubForge;
use forgeci_server::handlers::TaskContext;
use forgeci_server::models::PgStore;
use forgeci_server::routes::{app_router, AppState};
use forgeci_server::metrics;

#[derive(Parser)]
#[command(name = "forgeci", about = "ForgeCI build and test orchestration service")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "FORGECI_PORT", default_value = "8080")]
    port: u16,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();
    let config = ServiceConfig::from_env();

    tracing::info!("Starting ForgeCI server...");

    // Database connection pool
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&cli.database_url);
    let pool = Pool::builder(manager)
        .max_size(10)
        .build()
        .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
    let store = Arc::new(PgStore::new(pool));

    // Backend and forge clients
    let forge = Arc::new(GithubForge::new(config.forge_token.clone()));
    let copr = Arc::new(CoprHttp::new(
        config.copr_api_url.clone(),
        config.copr_owner.clone(),
    ));
    let koji = Arc::new(KojiHttp::new(config.koji_api_url.clone()));
    let testing_farm = Arc::new(TestingFarmHttp::new(
        config.testing_farm_api_url.clone(),
        config.testing_farm_token.clone(),
    ));

    std::fs::create_dir_all(&config.work_dir)?;

    let ctx = TaskContext {
        config,
        projects: store.clone(),
        triggers: store.clone(),
        copr_builds: store.clone(),
        koji_builds: store.clone(),
        test_runs: store.clone(),
        forge,
        copr,
        koji,
        testing_farm,
    };

    let dispatcher = Dispatcher::spawn(ctx.clone());
    let app = app_router(AppState { ctx, dispatcher });

    // Initialize metrics
    metrics::init_metrics();

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("ForgeCI server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
