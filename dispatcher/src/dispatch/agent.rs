// File: dispatcher/src/dispatch/agent.rs
use crate::batch::{ChangeSpec, ResourceTarget};
use crate::config::Config;
use crate::errors::AgentCallError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Outbound change call to the agent responsible for one environment.
///
/// Exactly one mutating call per target, at-most-once: retries, if wanted,
/// are a caller policy applied to the whole batch, never hidden here.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn apply(
        &self,
        env: &str,
        target: &ResourceTarget,
        add_label: bool,
    ) -> Result<(), AgentCallError>;
}

pub struct HttpAgentClient {
    config: Arc<Config>,
    client: Client,
}

impl HttpAgentClient {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint_for(change: &ChangeSpec) -> &'static str {
        match change {
            ChangeSpec::Scale { .. } => "/api/scale",
            ChangeSpec::Restart => "/api/restart",
            ChangeSpec::ImageUpdate { .. } => "/api/update-image",
            // Cron entries are replayed through the pipeline as plain
            // scale batches; a direct dispatch is an agent-side rejection.
            ChangeSpec::CronScale { .. } => "/api/scale",
        }
    }

    fn change_payload(target: &ResourceTarget, add_label: bool) -> Value {
        let mut payload = json!({
            "namespace": target.namespace,
            "deployment": target.deployment,
            "add_label": add_label,
        });

        match &target.change {
            ChangeSpec::Scale {
                replicas,
                resources,
            } => {
                payload["replicas"] = json!(replicas);
                if let Some(quota) = resources {
                    payload["resources"] = json!(quota);
                }
            }
            ChangeSpec::Restart => {}
            ChangeSpec::ImageUpdate { image } => {
                payload["image"] = json!(image);
            }
            ChangeSpec::CronScale { replicas, .. } => {
                payload["replicas"] = json!(replicas);
            }
        }

        payload
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn apply(
        &self,
        env: &str,
        target: &ResourceTarget,
        add_label: bool,
    ) -> Result<(), AgentCallError> {
        let env_config = self.config.environments.get(env).ok_or_else(|| {
            AgentCallError::Unreachable {
                env: env.to_string(),
                reason: "environment not present in resolution table".to_string(),
            }
        })?;

        let endpoint = Self::endpoint_for(&target.change);
        let url = format!("{}{}", env_config.agent_base_url(), endpoint);
        let payload = Self::change_payload(target, add_label);

        info!(
            "Dispatching {} for {}/{} to {}",
            target.change.kind(),
            target.namespace,
            target.deployment,
            url
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", env_config.api_key))
            .timeout(Duration::from_secs(
                self.config.dispatch.call_timeout_seconds,
            ))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentCallError::Unreachable {
                env: env.to_string(),
                reason: if e.is_timeout() {
                    format!("call timed out after {}s", self.config.dispatch.call_timeout_seconds)
                } else {
                    e.to_string()
                },
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(AgentCallError::Rejected {
                env: env.to_string(),
                message: format!("status {}: {}", status, message),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentCallError::Unreachable {
                env: env.to_string(),
                reason: format!("invalid agent response: {}", e),
            })?;

        let success = body
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if !success {
            let message = body
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("agent reported failure without a message")
                .to_string();
            return Err(AgentCallError::Rejected {
                env: env.to_string(),
                message,
            });
        }

        Ok(())
    }
}
