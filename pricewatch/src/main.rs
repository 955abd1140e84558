use anyhow::Context;
use tracing::{info, warn};

use pricewatch::api::{ApiServer, AppState};
use pricewatch::config::AppConfig;
use pricewatch::database;
use pricewatch::logging;
use pricewatch::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Keep the guard alive until exit so buffered file output is flushed
    let (logging_config, _log_guard) =
        logging::init_logging(&config.log_dir).context("Failed to initialize logging")?;

    // Initialize database
    database::ensure_database_dir(&config.database_url)
        .context("Failed to create database directory")?;
    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;
    info!(database_url = %config.database_url, "Database ready");

    let container = ServiceContainer::new(pool.clone(), &config)?;
    let scheduled = container.start().await?;
    info!(
        scheduled,
        cadence = %config.scheduler.default_cadence,
        "Scheduler started"
    );

    logging_config.start_retention_cleanup(container.cancellation_token());

    let state = AppState::with_services(
        container.product_service.clone(),
        Some(logging_config.clone()),
    );
    let server = ApiServer::with_state(config.api.clone(), state);

    let server_token = server.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        server_token.cancel();
    });

    let served = server.run().await;

    container.shutdown().await;
    pool.close().await;
    info!("pricewatch stopped");

    served?;
    Ok(())
}
