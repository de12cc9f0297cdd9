//! calwater - an in-memory query server for California county water data
//!
//! This is the main entry point for the calwater application.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn};

use calwater::handlers::router;
use calwater::{init_tracing, log_operation_end, log_operation_start};
use calwater::{AppState, CalWaterError, Config, Result};

fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    init_tracing(&config.log_level);
    info!("Starting calwater v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.server.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.build().map_err(|e| CalWaterError::Server {
        message: format!("Failed to start runtime: {}", e),
    })?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    info!("Data directory: {}", config.data.data_dir.display());

    let start = Instant::now();
    log_operation_start(
        "load_datasets",
        Some(if config.data.preload { "eager" } else { "lazy" }),
    );
    let state = AppState::new_shared(config.clone());
    log_operation_end("load_datasets", start, state.is_ok());
    let state: Arc<AppState> = state.map_err(|e| {
        error!("Failed to load datasets: {}", e);
        e
    })?;

    if !config.data.preload {
        warn!("Lazy loading enabled; broken data files are reported on first request");
    }
    for status in state.dataset.status() {
        info!(dataset = %status.dataset, file = %status.file, state = ?status.state, "Dataset");
    }

    let app = router(state);

    // Create the server address
    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| CalWaterError::Config {
                message: format!("Invalid host address: {}", e),
            })?,
        config.server.port,
    ));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CalWaterError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;

    info!(
        "Server listening on http://{}{}",
        addr, config.server.api_prefix
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CalWaterError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for a shutdown signal
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
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
