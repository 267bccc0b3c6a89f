//! Deferred batch registration and replay
//!
//! A cron entry is a stored single-target `BatchOperation` template keyed
//! by `(env, namespace, deployment, kind)`. At most one live entry per key:
//! registering over an existing key replaces schedule and payload instead
//! of duplicating. The registrar never executes schedules itself; the
//! runner hands the ready batch to the same pipeline used for immediate
//! requests when the trigger fires.

pub mod runner;

pub use runner::CronRunner;

use crate::batch::{BatchOperation, OperationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CronKey {
    pub env: String,
    pub namespace: String,
    pub deployment: String,
    pub kind: OperationKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct CronEntry {
    pub key: CronKey,
    pub schedule: String,
    pub batch: BatchOperation,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    Created,
    Replaced,
}

struct StoredEntry {
    entry: CronEntry,
    job_id: Option<Uuid>,
}

/// Keyed entry store, single writer per key via replace-on-register
pub struct CronScheduleRegistrar {
    entries: RwLock<HashMap<CronKey, StoredEntry>>,
}

impl CronScheduleRegistrar {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or atomically replace the entry for its key. Returns the
    /// outcome plus the job id of a replaced entry so the caller can drop
    /// the superseded trigger.
    pub async fn register(
        &self,
        entry: CronEntry,
        job_id: Option<Uuid>,
    ) -> (RegisterOutcome, Option<Uuid>) {
        let mut entries = self.entries.write().await;
        let key = entry.key.clone();
        let previous = entries.insert(key.clone(), StoredEntry { entry, job_id });

        match previous {
            Some(old) => {
                info!(
                    "Replaced cron entry for {}/{}/{} ({})",
                    key.env, key.namespace, key.deployment, key.kind
                );
                (RegisterOutcome::Replaced, old.job_id)
            }
            None => {
                info!(
                    "Created cron entry for {}/{}/{} ({})",
                    key.env, key.namespace, key.deployment, key.kind
                );
                (RegisterOutcome::Created, None)
            }
        }
    }

    /// Remove an entry if present; a missing key is a no-op. Returns the
    /// job id of the removed entry.
    pub async fn unregister(&self, key: &CronKey) -> Option<Uuid> {
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(old) => {
                info!(
                    "Unregistered cron entry for {}/{}/{} ({})",
                    key.env, key.namespace, key.deployment, key.kind
                );
                old.job_id
            }
            None => None,
        }
    }

    pub async fn get(&self, key: &CronKey) -> Option<CronEntry> {
        let entries = self.entries.read().await;
        entries.get(key).map(|stored| stored.entry.clone())
    }

    pub async fn list(&self) -> Vec<CronEntry> {
        let entries = self.entries.read().await;
        let mut all: Vec<CronEntry> = entries.values().map(|s| s.entry.clone()).collect();
        all.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        all
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for CronScheduleRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ChangeSpec, ResourceTarget};

    fn entry(deployment: &str, schedule: &str, replicas: u32) -> CronEntry {
        let target = ResourceTarget {
            env: "prod-a".to_string(),
            namespace: "checkout".to_string(),
            deployment: deployment.to_string(),
            change: ChangeSpec::CronScale {
                schedule: schedule.to_string(),
                replicas,
            },
        };
        CronEntry {
            key: CronKey {
                env: "prod-a".to_string(),
                namespace: "checkout".to_string(),
                deployment: deployment.to_string(),
                kind: OperationKind::CronScale,
            },
            schedule: schedule.to_string(),
            batch: BatchOperation {
                kind: OperationKind::CronScale,
                env: "prod-a".to_string(),
                add_label: false,
                interval_ms: 0,
                targets: vec![target],
            },
            registered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn register_same_key_replaces_instead_of_duplicating() {
        let registrar = CronScheduleRegistrar::new();

        let first_job = Uuid::new_v4();
        let (outcome, old) = registrar
            .register(entry("api", "0 0 8 * * *", 3), Some(first_job))
            .await;
        assert_eq!(outcome, RegisterOutcome::Created);
        assert!(old.is_none());

        let (outcome, old) = registrar
            .register(entry("api", "0 0 20 * * *", 6), Some(Uuid::new_v4()))
            .await;
        assert_eq!(outcome, RegisterOutcome::Replaced);
        assert_eq!(old, Some(first_job));

        assert_eq!(registrar.len().await, 1);
        let live = registrar
            .get(&entry("api", "", 0).key)
            .await
            .expect("entry should exist");
        assert_eq!(live.schedule, "0 0 20 * * *");
    }

    #[tokio::test]
    async fn distinct_keys_coexist() {
        let registrar = CronScheduleRegistrar::new();
        registrar.register(entry("api", "0 0 8 * * *", 3), None).await;
        registrar
            .register(entry("worker", "0 0 8 * * *", 5), None)
            .await;
        assert_eq!(registrar.len().await, 2);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registrar = CronScheduleRegistrar::new();
        let key = entry("api", "0 0 8 * * *", 3).key.clone();

        registrar
            .register(entry("api", "0 0 8 * * *", 3), None)
            .await;
        registrar.unregister(&key).await;
        assert!(registrar.is_empty().await);

        // Removing again is a no-op, not an error
        assert!(registrar.unregister(&key).await.is_none());
    }
}
