// File: dispatcher/src/config/manager.rs
use super::Config;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_path: String) -> Result<Self> {
        let config = Self::load_configuration(&config_path).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_path: &str) -> Result<Config> {
        let content = fs::read_to_string(config_path)
            .await
            .map_err(|e| anyhow!("Failed to read config {}: {}", config_path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", config_path, e))?;

        Self::validate(&config)?;

        info!(
            "Loaded configuration: {} environments, call timeout {}s, max {} in-flight per env",
            config.environments.len(),
            config.dispatch.call_timeout_seconds,
            config.dispatch.max_concurrent_per_env
        );

        Ok(config)
    }

    fn validate(config: &Config) -> Result<()> {
        if config.environments.is_empty() {
            return Err(anyhow!("No environments configured"));
        }

        for (env, env_config) in &config.environments {
            if env_config.host.trim().is_empty() {
                return Err(anyhow!("Environment '{}' has an empty agent host", env));
            }
            if env_config.api_key.trim().is_empty() {
                return Err(anyhow!("Environment '{}' has an empty api_key", env));
            }
        }

        if config.dispatch.max_concurrent_per_env == 0 {
            return Err(anyhow!("dispatch.max_concurrent_per_env must be at least 1"));
        }

        Ok(())
    }
}
