//! Shared test doubles and fixtures for the dispatcher integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dispatcher::admission::{AdmissionFlag, AdmissionFlagStore};
use dispatcher::batch::{ChangeSpec, ResourceTarget};
use dispatcher::config::{Config, DispatchConfig, EnvironmentConfig};
use dispatcher::dispatch::AgentClient;
use dispatcher::errors::AgentCallError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const TEST_ENV: &str = "prod-a";

/// One observed agent call, with the issuance instant for pacing asserts
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub namespace: String,
    pub deployment: String,
    pub add_label: bool,
    pub issued_at: Instant,
}

/// In-memory agent double: records every call and fails the deployments
/// it was told to fail
#[derive(Default)]
pub struct MockAgent {
    calls: Mutex<Vec<RecordedCall>>,
    rejected: HashSet<String>,
    unreachable: HashSet<String>,
    base_delay: Duration,
    per_target_delay: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, deployment: &str) -> Self {
        self.rejected.insert(deployment.to_string());
        self
    }

    pub fn unreachable(mut self, deployment: &str) -> Self {
        self.unreachable.insert(deployment.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_target_delay(mut self, deployment: &str, delay: Duration) -> Self {
        self.per_target_delay.insert(deployment.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentClient for MockAgent {
    async fn apply(
        &self,
        env: &str,
        target: &ResourceTarget,
        add_label: bool,
    ) -> Result<(), AgentCallError> {
        self.calls.lock().unwrap().push(RecordedCall {
            namespace: target.namespace.clone(),
            deployment: target.deployment.clone(),
            add_label,
            issued_at: Instant::now(),
        });

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = self
            .per_target_delay
            .get(&target.deployment)
            .copied()
            .unwrap_or(self.base_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.contains(&target.deployment) {
            return Err(AgentCallError::Unreachable {
                env: env.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        if self.rejected.contains(&target.deployment) {
            return Err(AgentCallError::Rejected {
                env: env.to_string(),
                message: format!("deployment {} not found", target.deployment),
            });
        }

        Ok(())
    }
}

/// Flag store double returning a fixed flag, or failing when `flag` is None
pub struct StaticFlagStore {
    flag: Option<AdmissionFlag>,
}

impl StaticFlagStore {
    pub fn enabled() -> Self {
        Self {
            flag: Some(AdmissionFlag {
                admission: true,
                scheduler: true,
            }),
        }
    }

    pub fn disabled() -> Self {
        Self {
            flag: Some(AdmissionFlag {
                admission: true,
                scheduler: false,
            }),
        }
    }

    pub fn unavailable() -> Self {
        Self { flag: None }
    }
}

#[async_trait]
impl AdmissionFlagStore for StaticFlagStore {
    async fn lookup(&self, _env: &str, _namespace: &str) -> Result<AdmissionFlag> {
        self.flag
            .ok_or_else(|| anyhow!("flag store unreachable"))
    }
}

pub fn test_config() -> Arc<Config> {
    test_config_with(DispatchConfig {
        call_timeout_seconds: 5,
        max_concurrent_per_env: 4,
    })
}

pub fn test_config_with(dispatch: DispatchConfig) -> Arc<Config> {
    let mut environments = HashMap::new();
    environments.insert(
        TEST_ENV.to_string(),
        EnvironmentConfig {
            host: "127.0.0.1".to_string(),
            agent_port: 18080,
            api_key: "test-key".to_string(),
        },
    );

    Arc::new(Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admission_flag_url: "http://127.0.0.1:18081".to_string(),
        dispatch,
        environments,
    })
}

pub fn scale_target(namespace: &str, deployment: &str, replicas: u32) -> ResourceTarget {
    ResourceTarget {
        env: TEST_ENV.to_string(),
        namespace: namespace.to_string(),
        deployment: deployment.to_string(),
        change: ChangeSpec::Scale {
            replicas,
            resources: None,
        },
    }
}

pub fn restart_target(namespace: &str, deployment: &str) -> ResourceTarget {
    ResourceTarget {
        env: TEST_ENV.to_string(),
        namespace: namespace.to_string(),
        deployment: deployment.to_string(),
        change: ChangeSpec::Restart,
    }
}

pub fn image_target(namespace: &str, deployment: &str, image: &str) -> ResourceTarget {
    ResourceTarget {
        env: TEST_ENV.to_string(),
        namespace: namespace.to_string(),
        deployment: deployment.to_string(),
        change: ChangeSpec::ImageUpdate {
            image: image.to_string(),
        },
    }
}

pub fn cron_target(
    namespace: &str,
    deployment: &str,
    schedule: &str,
    replicas: u32,
) -> ResourceTarget {
    ResourceTarget {
        env: TEST_ENV.to_string(),
        namespace: namespace.to_string(),
        deployment: deployment.to_string(),
        change: ChangeSpec::CronScale {
            schedule: schedule.to_string(),
            replicas,
        },
    }
}
