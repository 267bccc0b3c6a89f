// File: dispatcher/src/services/batch_service.rs
//
// The console-facing operation surface: one method per action, all driving
// the validate -> authorize -> pace/dispatch -> aggregate pipeline.
//
use crate::admission::{AdmissionFlagStore, AdmissionLabelPolicy};
use crate::batch::{
    validator, BatchOperation, BatchResult, OperationKind, ResourceTarget,
};
use crate::config::Config;
use crate::dispatch::{aggregator, AgentClient, CancelHandle, PacingScheduler};
use crate::errors::DispatchError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

pub struct BatchService {
    config: Arc<Config>,
    policy: AdmissionLabelPolicy,
    scheduler: PacingScheduler,
}

impl BatchService {
    pub fn new(
        config: Arc<Config>,
        flag_store: Arc<dyn AdmissionFlagStore>,
        agent: Arc<dyn AgentClient>,
    ) -> Self {
        let scheduler = PacingScheduler::new(agent, config.dispatch.max_concurrent_per_env);
        Self {
            config,
            policy: AdmissionLabelPolicy::new(flag_store),
            scheduler,
        }
    }

    pub async fn scale(
        &self,
        env: &str,
        add_label: bool,
        targets: Vec<ResourceTarget>,
        interval_ms: u64,
    ) -> Result<BatchResult, DispatchError> {
        self.execute(
            OperationKind::Scale,
            env,
            add_label,
            targets,
            interval_ms,
            CancelHandle::new(),
        )
        .await
    }

    pub async fn restart(
        &self,
        env: &str,
        targets: Vec<ResourceTarget>,
        interval_ms: u64,
    ) -> Result<BatchResult, DispatchError> {
        self.execute(
            OperationKind::Restart,
            env,
            false,
            targets,
            interval_ms,
            CancelHandle::new(),
        )
        .await
    }

    pub async fn update_image(
        &self,
        env: &str,
        targets: Vec<ResourceTarget>,
    ) -> Result<BatchResult, DispatchError> {
        self.execute(
            OperationKind::ImageUpdate,
            env,
            false,
            targets,
            0,
            CancelHandle::new(),
        )
        .await
    }

    /// Run one batch end-to-end. Pre-dispatch failures (validation, unknown
    /// environment, admission lookup) reject the batch atomically: nothing
    /// is dispatched. Per-target agent failures only show up inside the
    /// returned `BatchResult`.
    pub async fn execute(
        &self,
        kind: OperationKind,
        env: &str,
        add_label: bool,
        targets: Vec<ResourceTarget>,
        interval_ms: u64,
        cancel: CancelHandle,
    ) -> Result<BatchResult, DispatchError> {
        let targets = validator::validate_batch(env, kind, &targets)?;

        if !self.config.environments.contains_key(env) {
            return Err(DispatchError::UnknownEnvironment {
                env: env.to_string(),
            });
        }

        let add_label = self.resolve_pinning(env, add_label, &targets).await?;

        let batch = BatchOperation {
            kind,
            env: env.to_string(),
            add_label,
            interval_ms,
            targets,
        };

        info!(
            "Dispatching {} batch to '{}': {} targets, interval {}ms, pinning {}",
            batch.kind,
            batch.env,
            batch.targets.len(),
            batch.interval_ms,
            batch.add_label
        );

        let results = self.scheduler.run(&batch, &cancel).await;
        let batch_result = aggregator::aggregate(results);

        info!(
            "Batch {} on '{}' finished: {:?} ({} succeeded, {} failed)",
            batch.kind, batch.env, batch_result.status, batch_result.succeeded, batch_result.failed
        );

        Ok(batch_result)
    }

    /// Gate the pinning label behind the external admission flag, once per
    /// distinct namespace in the batch. A flag the store reports disabled
    /// downgrades the request; a store failure rejects the batch.
    async fn resolve_pinning(
        &self,
        env: &str,
        add_label: bool,
        targets: &[ResourceTarget],
    ) -> Result<bool, DispatchError> {
        if !add_label {
            return Ok(false);
        }

        let namespaces: BTreeSet<&str> = targets.iter().map(|t| t.namespace.as_str()).collect();

        for namespace in namespaces {
            if !self.policy.authorize(env, namespace, true).await? {
                warn!(
                    "Pinning requested but disabled for '{}/{}'; dispatching without label",
                    env, namespace
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Configured environment names, for the console's environment picker
    pub fn environments(&self) -> Vec<String> {
        let mut envs: Vec<String> = self.config.environments.keys().cloned().collect();
        envs.sort();
        envs
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }
}
