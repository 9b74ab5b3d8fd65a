use std::sync::Arc;

use anyhow::{Context, Result};
use gatherer::{
    app_state::AppState, config::Config, fetcher::HttpClient, logging,
    repositories::PgStore, router::router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

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
    let app = router(AppState::new(store, client, &config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(addr = config.bind_addr(), "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
