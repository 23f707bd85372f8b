use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;

use aurum_backend::{config, middleware, routes, AppState};

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first
    let config = config::Settings::new()?;

    middleware::init_logging(&config.log_level, &config.log_format, &config.sql_log_level)?;

    tracing::info!(
        environment = %config.environment,
        "Starting Aurum Life backend v{}",
        env!("CARGO_PKG_VERSION")
    );

    let addr: SocketAddr = config.bind_address().parse()?;

    // Connects, migrates and wires services
    let app_state = AppState::new(config).await?;
    app_state.start_background_tasks().await;

    if app_state.config.rate_limit_enabled {
        let limiter = app_state.ip_rate_limiter.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
            loop {
                ticker.tick().await;
                limiter.prune();
            }
        });
    }

    let app = routes::create_router(app_state);

    tracing::info!("Server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
