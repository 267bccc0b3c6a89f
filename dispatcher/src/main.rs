// File: dispatcher/src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod admission;
mod batch;
mod config;
mod cron;
mod dispatch;
mod errors;
mod services;
mod web;

use admission::HttpAdmissionFlagStore;
use config::ConfigManager;
use cron::CronRunner;
use dispatch::HttpAgentClient;
use services::BatchService;
use web::start_web_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("dispatcher=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting batch operation dispatcher");

    // Load configuration
    let config_path =
        std::env::var("DISPATCHER_CONFIG").unwrap_or_else(|_| "config/main.toml".to_string());
    let config_manager = ConfigManager::new(config_path).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: {} environments",
        config.environments.len()
    );

    // Outbound collaborators: per-environment agents and the admission flag store
    let agent_client = Arc::new(HttpAgentClient::new(config.clone()));
    let flag_store = Arc::new(HttpAdmissionFlagStore::new(&config));

    let batch_service = Arc::new(BatchService::new(
        config.clone(),
        flag_store,
        agent_client,
    ));
    info!("Batch service initialized");

    // Cron runner replays registered entries through the same pipeline
    let cron_runner = Arc::new(CronRunner::new(batch_service.clone()).await?);
    cron_runner.start().await?;

    start_web_server(config, batch_service, cron_runner).await?;

    Ok(())
}
