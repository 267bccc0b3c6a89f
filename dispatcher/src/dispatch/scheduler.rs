//! Paced dispatch of batch targets
//!
//! With a positive interval, targets go out strictly in input order with at
//! least `interval_ms` between call issuances, giving the cluster time to
//! stabilize between disruptive changes. Without an interval, dispatch runs
//! under a fixed in-flight cap per environment. Per-target failures never
//! halt the run; operators need to know exactly which deployments made it.

use super::agent::AgentClient;
use super::cancel::CancelHandle;
use crate::batch::{BatchOperation, OperationResult, ResourceTarget};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep, Duration};
use tracing::info;

pub struct PacingScheduler {
    agent: Arc<dyn AgentClient>,
    max_concurrent_per_env: usize,
    // The in-flight cap is per environment, not per batch: concurrent
    // batches against the same environment share one semaphore.
    env_limits: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl PacingScheduler {
    pub fn new(agent: Arc<dyn AgentClient>, max_concurrent_per_env: usize) -> Self {
        Self {
            agent,
            max_concurrent_per_env: max_concurrent_per_env.max(1),
            env_limits: Mutex::new(HashMap::new()),
        }
    }

    /// Dispatch every target of the batch, returning one result per
    /// dispatched target in input order. Cancellation stops further
    /// dispatch but keeps results already produced.
    pub async fn run(&self, batch: &BatchOperation, cancel: &CancelHandle) -> Vec<OperationResult> {
        let limit = self.env_limit(&batch.env).await;

        if batch.interval_ms > 0 {
            self.run_paced(batch, cancel, limit).await
        } else {
            self.run_concurrent(batch, cancel, limit).await
        }
    }

    async fn env_limit(&self, env: &str) -> Arc<Semaphore> {
        let mut limits = self.env_limits.lock().await;
        limits
            .entry(env.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent_per_env)))
            .clone()
    }

    /// Pacing implies serialization: one in-flight call, the next issued
    /// only once the previous issuance is at least `interval_ms` old.
    async fn run_paced(
        &self,
        batch: &BatchOperation,
        cancel: &CancelHandle,
        limit: Arc<Semaphore>,
    ) -> Vec<OperationResult> {
        let interval = Duration::from_millis(batch.interval_ms);
        let mut results = Vec::with_capacity(batch.targets.len());
        let mut last_issued: Option<Instant> = None;

        for (index, target) in batch.targets.iter().enumerate() {
            if let Some(issued) = last_issued {
                let since_issue = issued.elapsed();
                if since_issue < interval {
                    sleep(interval - since_issue).await;
                }
            }

            // Checked after the interval sleep: a cancel that lands during
            // the wait must not let the next target out.
            if cancel.is_cancelled() {
                info!(
                    "Batch cancelled after {} of {} targets",
                    results.len(),
                    batch.targets.len()
                );
                break;
            }

            let _permit = limit.acquire().await.ok();
            last_issued = Some(Instant::now());
            let dispatched_at = Utc::now();
            let outcome = self.agent.apply(&batch.env, target, batch.add_label).await;
            results.push(OperationResult::from_outcome(
                index,
                target,
                dispatched_at,
                outcome,
            ));
        }

        results
    }

    /// No inter-call delay; in-flight calls are capped by the shared
    /// per-environment semaphore and results are re-indexed by original
    /// position since completion order is free to differ.
    async fn run_concurrent(
        &self,
        batch: &BatchOperation,
        cancel: &CancelHandle,
        limit: Arc<Semaphore>,
    ) -> Vec<OperationResult> {
        let targets: Vec<(usize, ResourceTarget)> =
            batch.targets.iter().cloned().enumerate().collect();

        let mut results: Vec<OperationResult> = stream::iter(targets)
            .map(|(index, target)| {
                let agent = self.agent.clone();
                let cancel = cancel.clone();
                let env = batch.env.clone();
                let add_label = batch.add_label;
                let limit = limit.clone();
                async move {
                    let _permit = limit.acquire_owned().await.ok();
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let dispatched_at = Utc::now();
                    let outcome = agent.apply(&env, &target, add_label).await;
                    Some(OperationResult::from_outcome(
                        index,
                        &target,
                        dispatched_at,
                        outcome,
                    ))
                }
            })
            .buffer_unordered(self.max_concurrent_per_env)
            .filter_map(|result| async move { result })
            .collect()
            .await;

        results.sort_by_key(|r| r.index);
        results
    }
}
