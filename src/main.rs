use std::net::SocketAddr;
use std::sync::Arc;

use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adoptable::config::Config;
use adoptable::payments::SimulatedGateway;
use adoptable::storage::Storage;
use adoptable::{app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "adoptable=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Adoptable...");

    let config = Config::from_env()?;
    tracing::info!("Environment: {}", config.env_mode);

    tracing::info!("Initializing database connection pool...");
    let db_pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connection pool initialized successfully");

    let storage = match &config.storage {
        Some(cfg) => Storage::s3(cfg)?,
        None => Storage::memory("http://localhost:8080/uploads")?,
    };

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit settings"))?,
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = AppState {
        db: db_pool,
        storage,
        payments: Arc::new(SimulatedGateway::new(config.payment_redirect_delay)),
        config: Arc::new(config),
    };

    let router = app(state).layer(GovernorLayer::new(governor_config));

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install signal handler: {}", e);
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

    tracing::info!("signal received, starting graceful shutdown");
}
