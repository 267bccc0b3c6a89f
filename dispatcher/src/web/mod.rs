// File: dispatcher/src/web/mod.rs
pub mod handlers;
pub mod server;

pub use server::start_web_server;

use std::sync::Arc;

use crate::config::Config;
use crate::cron::CronRunner;
use crate::services::BatchService;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub batch_service: Arc<BatchService>,
    pub cron_runner: Arc<CronRunner>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        batch_service: Arc<BatchService>,
        cron_runner: Arc<CronRunner>,
    ) -> Self {
        Self {
            config,
            batch_service,
            cron_runner,
        }
    }
}
