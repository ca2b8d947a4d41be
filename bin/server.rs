// BMI Service - Web Server
// REST API with Axum over the configured history store

use anyhow::{Context, Result};
use bmi_service::logging::{init_logging, Console};
use bmi_service::{connect, router, AppConfig, AppState, VERSION};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _guard = init_logging(&config.log, Console::Stderr);

    info!(version = VERSION, "Starting BMI service");
    info!(database = ?config.database, "Database configuration");

    // Store and schema come up before the listener; failing here aborts startup
    let store = match connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Database initialization failed");
            return Err(e).context("Database initialization failed");
        }
    };

    let app = router(AppState::new(store.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Server running");
    info!("   API:  http://{}/calculate-bmi", config.bind_addr);
    info!("   Form: http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
