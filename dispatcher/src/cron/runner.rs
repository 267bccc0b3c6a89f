// File: dispatcher/src/cron/runner.rs
use super::{CronEntry, CronKey, CronScheduleRegistrar, RegisterOutcome};
use crate::batch::{BatchOperation, ChangeSpec, OperationKind, ResourceTarget};
use crate::batch::validator;
use crate::errors::DispatchError;
use crate::services::BatchService;
use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

#[derive(Debug, Clone, Serialize)]
pub struct CronRegistration {
    pub key: CronKey,
    pub outcome: RegisterOutcome,
}

/// Time-based trigger for registered cron entries.
///
/// Owns the job scheduler; each live entry maps to exactly one job whose
/// firing replays the stored template through the normal scale pipeline.
pub struct CronRunner {
    scheduler: JobScheduler,
    registrar: Arc<CronScheduleRegistrar>,
    service: Arc<BatchService>,
}

impl CronRunner {
    pub async fn new(service: Arc<BatchService>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create job scheduler: {}", e))?;

        Ok(Self {
            scheduler,
            registrar: Arc::new(CronScheduleRegistrar::new()),
            service,
        })
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start job scheduler: {}", e))?;
        info!("Cron runner started");
        Ok(())
    }

    /// Register one deferred scale per target. An entry whose key already
    /// exists is replaced, and the superseded trigger is dropped.
    pub async fn register(
        &self,
        env: &str,
        add_label: bool,
        targets: Vec<ResourceTarget>,
    ) -> Result<Vec<CronRegistration>, DispatchError> {
        let targets = validator::validate_batch(env, OperationKind::CronScale, &targets)?;

        if !self.service.config().environments.contains_key(env) {
            return Err(DispatchError::UnknownEnvironment {
                env: env.to_string(),
            });
        }

        let mut registrations = Vec::with_capacity(targets.len());

        for target in targets {
            let schedule = match &target.change {
                ChangeSpec::CronScale { schedule, .. } => schedule.clone(),
                // validate_batch already pinned the payload kind
                _ => unreachable!("cron registration only accepts cron_scale payloads"),
            };

            let key = CronKey {
                env: env.to_string(),
                namespace: target.namespace.clone(),
                deployment: target.deployment.clone(),
                kind: OperationKind::CronScale,
            };

            let job_id = self
                .schedule_replay(env, add_label, &schedule, &target)
                .await?;

            let entry = CronEntry {
                key: key.clone(),
                schedule: schedule.clone(),
                batch: BatchOperation {
                    kind: OperationKind::CronScale,
                    env: env.to_string(),
                    add_label,
                    interval_ms: 0,
                    targets: vec![target],
                },
                registered_at: Utc::now(),
            };

            let (outcome, superseded) = self.registrar.register(entry, Some(job_id)).await;
            if let Some(old_job) = superseded {
                if let Err(e) = self.scheduler.remove(&old_job).await {
                    error!("Failed to remove superseded cron job {}: {}", old_job, e);
                }
            }

            info!(
                "Cron entry {:?} for {}/{}/{}: {}",
                outcome, key.env, key.namespace, key.deployment, schedule
            );
            registrations.push(CronRegistration { key, outcome });
        }

        Ok(registrations)
    }

    /// Remove an entry and its trigger; missing keys are a no-op.
    pub async fn unregister(&self, key: &CronKey) -> Result<bool> {
        match self.registrar.unregister(key).await {
            Some(job_id) => {
                self.scheduler
                    .remove(&job_id)
                    .await
                    .map_err(|e| anyhow!("Failed to remove cron job {}: {}", job_id, e))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn entries(&self) -> Vec<CronEntry> {
        self.registrar.list().await
    }

    pub fn registrar(&self) -> Arc<CronScheduleRegistrar> {
        self.registrar.clone()
    }

    async fn schedule_replay(
        &self,
        env: &str,
        add_label: bool,
        schedule: &str,
        target: &ResourceTarget,
    ) -> Result<uuid::Uuid, DispatchError> {
        let service = self.service.clone();
        let env_owned = env.to_string();
        let replay = replay_target(target);

        let job = Job::new_async(schedule, move |_uuid, _scheduler| {
            let service = service.clone();
            let env = env_owned.clone();
            let target = replay.clone();

            Box::pin(async move {
                info!(
                    "Cron trigger fired for {}/{}/{}",
                    env, target.namespace, target.deployment
                );

                match service.scale(&env, add_label, vec![target.clone()], 0).await {
                    Ok(result) => {
                        info!(
                            "Scheduled scale for {}/{}/{} finished: {:?}",
                            env, target.namespace, target.deployment, result.status
                        );
                    }
                    Err(e) => {
                        error!(
                            "Scheduled scale for {}/{}/{} rejected: {}",
                            env, target.namespace, target.deployment, e
                        );
                    }
                }
            })
        })
        .map_err(|e| DispatchError::ScheduleFailed {
            reason: format!("invalid job for schedule '{}': {}", schedule, e),
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| DispatchError::ScheduleFailed {
                reason: format!("failed to add job for schedule '{}': {}", schedule, e),
            })
    }
}

/// The stored template replays as a plain scale of the recorded replica
/// count through the immediate pipeline.
fn replay_target(target: &ResourceTarget) -> ResourceTarget {
    let replicas = match &target.change {
        ChangeSpec::CronScale { replicas, .. } => *replicas,
        _ => 0,
    };

    ResourceTarget {
        env: target.env.clone(),
        namespace: target.namespace.clone(),
        deployment: target.deployment.clone(),
        change: ChangeSpec::Scale {
            replicas,
            resources: None,
        },
    }
}
