//! Ferrobank entry point: config, logging, pool, mail worker, HTTP server.

use std::sync::Arc;

use anyhow::Context;

use ferrobank::api::{self, AppState};
use ferrobank::config::AppConfig;
use ferrobank::logging::init_logging;
use ferrobank::mail::LogEmailSender;
use ferrobank::store::{Database, Store};
use ferrobank::token::TokenMaker;
use ferrobank::worker::{TaskProcessor, task_channel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = AppConfig::load(&config_path)?;

    let _log_guard = init_logging(&config);
    tracing::info!(environment = %config.environment, "starting ferrobank");

    let database = Database::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    database.health_check().await.context("database health check failed")?;
    let store = Store::new(database.pool().clone());

    let (distributor, task_rx) = task_channel(config.server.task_queue_size);

    let mailer = Arc::new(LogEmailSender::new(&config.mail));
    let verify_url = format!("http://{}/api/v1/verify_email", config.listen_addr());
    let processor = TaskProcessor::new(store.clone(), mailer, task_rx, verify_url);
    tokio::spawn(processor.run());

    let state = Arc::new(AppState {
        store,
        token_maker: TokenMaker::new(&config.token.secret_key),
        distributor: Arc::new(distributor),
        config: config.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    tracing::info!(addr = %config.listen_addr(), "HTTP server listening");

    axum::serve(listener, api::router(state))
        .await
        .context("HTTP server exited")?;

    Ok(())
}
