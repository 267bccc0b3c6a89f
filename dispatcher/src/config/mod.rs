// File: dispatcher/src/config/mod.rs
pub mod manager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
pub use manager::ConfigManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the admission/scheduler flag service consulted before
    /// attaching the fixed-node pinning label
    pub admission_flag_url: String,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Environment resolution table: env name -> agent endpoint
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,
    /// In-flight call cap per environment when no pacing interval is set.
    /// A positive interval forces serialization regardless of this value.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_per_env: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout_seconds: default_call_timeout(),
            max_concurrent_per_env: default_max_concurrent(),
        }
    }
}

fn default_call_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub host: String,
    pub agent_port: u16,
    pub api_key: String,
}

impl EnvironmentConfig {
    pub fn agent_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.agent_port)
    }
}
