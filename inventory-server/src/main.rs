use inventory_server::utils::init_logger_with_file;
use inventory_server::{Config, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. .env is optional
    dotenv::dotenv().ok();

    // 2. config, then logging (its level and directory come from config)
    let config = Config::from_env()?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(environment = %config.environment, "Inventory server starting...");

    // 3. database, cache, service
    let state = ServerState::initialize(&config).await?;
    tracing::info!(
        database = %config.database_url,
        cache = ?state.cache_backend,
        "Inventory server ready"
    );

    // 4. run until asked to stop
    shutdown_signal().await;
    state.shutdown().await;
    tracing::info!("Inventory server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
