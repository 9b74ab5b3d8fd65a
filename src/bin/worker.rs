use std::sync::Arc;

use anyhow::{Context, Result};
use gatherer::{
    config::Config, fetcher::HttpClient, logging, repositories::PgStore,
    scheduler::SyncScheduler, subscriptions::SubscriptionService, sync::SyncOrchestrator,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::init(config.log_format);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(config.database_url())
        .await
        .context("failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    let client = Arc::new(HttpClient::new(config.http.clone())?);
    let orchestrator = Arc::new(SyncOrchestrator::new(
        store.clone(),
        client.clone(),
        config.sync.clone(),
    ));
    let subscriptions = SubscriptionService::new(store.clone(), client);
    let scheduler = SyncScheduler::new(store, orchestrator, subscriptions, config.worker_interval);

    let shutdown_token = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        info!("received shutdown signal");
        shutdown_token.cancel();
    });

    scheduler.run().await;
    Ok(())
}
