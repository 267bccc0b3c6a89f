//! Fixed-node pinning gate
//!
//! The pinning label may only be attached when an external flag store
//! reports both the admission controller and the custom scheduler active
//! for the target namespace. The core never writes these flags; it only
//! reads them. A failed lookup rejects the batch rather than silently
//! defaulting to allow or deny.

use crate::config::Config;
use crate::errors::DispatchError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// External, read-only per-namespace fact
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AdmissionFlag {
    pub admission: bool,
    pub scheduler: bool,
}

impl AdmissionFlag {
    pub fn pinning_enabled(&self) -> bool {
        self.admission && self.scheduler
    }
}

#[async_trait]
pub trait AdmissionFlagStore: Send + Sync {
    async fn lookup(&self, env: &str, namespace: &str) -> Result<AdmissionFlag>;
}

/// Flag lookup against the admission flag service over HTTP
pub struct HttpAdmissionFlagStore {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAdmissionFlagStore {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.admission_flag_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.dispatch.call_timeout_seconds),
        }
    }
}

#[async_trait]
impl AdmissionFlagStore for HttpAdmissionFlagStore {
    async fn lookup(&self, env: &str, namespace: &str) -> Result<AdmissionFlag> {
        let url = format!("{}/api/admission/status", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("env", env), ("namespace", namespace)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("flag store request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "flag store returned status {} for {}/{}",
                response.status(),
                env,
                namespace
            ));
        }

        let flag: AdmissionFlag = response
            .json()
            .await
            .map_err(|e| anyhow!("invalid flag store response: {}", e))?;

        Ok(flag)
    }
}

/// Decides whether the pinning label may be attached for a batch
pub struct AdmissionLabelPolicy {
    store: Arc<dyn AdmissionFlagStore>,
}

impl AdmissionLabelPolicy {
    pub fn new(store: Arc<dyn AdmissionFlagStore>) -> Self {
        Self { store }
    }

    /// Trivially allowed when pinning was not requested. Otherwise allowed
    /// only when the flag reports both admission and scheduler active for
    /// the namespace. A store failure surfaces as
    /// `AdmissionCheckUnavailable` and must reject the whole batch.
    pub async fn authorize(
        &self,
        env: &str,
        namespace: &str,
        add_label_requested: bool,
    ) -> Result<bool, DispatchError> {
        if !add_label_requested {
            return Ok(true);
        }

        let flag = self.store.lookup(env, namespace).await.map_err(|e| {
            DispatchError::AdmissionCheckUnavailable {
                env: env.to_string(),
                namespace: namespace.to_string(),
                reason: e.to_string(),
            }
        })?;

        let allowed = flag.pinning_enabled();
        info!(
            "Pinning gate for {}/{}: admission={} scheduler={} -> allowed={}",
            env, namespace, flag.admission, flag.scheduler, allowed
        );

        Ok(allowed)
    }
}
