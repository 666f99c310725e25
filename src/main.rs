use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use item_service::api::handlers::AppStateInner;
use item_service::api::routes::create_router;
use item_service::config::Config;
use item_service::{metrics, store};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Starting graceful shutdown...");
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_level);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    info!(
        environment = %config.environment,
        "Starting Item Service v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize metrics
    metrics::init_metrics();
    info!("Metrics registry initialized");

    tokio::fs::create_dir_all(&config.uploads.path)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.uploads.path.display()))?;

    // Initialize item store
    info!("Connecting to item store...");
    let store = store::init_store(&config.database)
        .await
        .context("Failed to initialize item store")?;
    store
        .test_connection()
        .await
        .context("Failed to test item store connection")?;
    info!("Item store ready");

    if config.redis_url.is_some() {
        info!("REDIS_URL is set but no cache layer is configured to use it");
    }

    let addr = config.server_address();

    // Create application state
    let state = Arc::new(AppStateInner::new(config, store)?);

    info!(
        max_requests = state.rate_limiter.max_requests(),
        window_secs = state.rate_limiter.window().as_secs(),
        "Rate limiting /api requests per client IP"
    );
    info!(
        token_ttl_secs = state.config.auth.jwt_expiration_secs,
        "Bearer tokens verified with HS256"
    );

    // Start background rate limiter cleanup
    let _cleanup_handle = state.rate_limiter.spawn_cleanup(RATE_LIMIT_CLEANUP_INTERVAL);

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", addr))?;

    info!("Server listening on {}", addr);

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
