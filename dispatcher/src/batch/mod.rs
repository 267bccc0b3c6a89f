//! Batch data model
//!
//! A `BatchOperation` is one user-submitted set of per-deployment changes
//! sharing a kind, environment, pinning flag and pacing interval. Target
//! order is preserved end-to-end: it defines both dispatch order and the
//! order of entries in the returned `BatchResult`.

pub mod validator;

use crate::errors::AgentCallError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Scale,
    Restart,
    ImageUpdate,
    CronScale,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Scale => "scale",
            OperationKind::Restart => "restart",
            OperationKind::ImageUpdate => "image_update",
            OperationKind::CronScale => "cron_scale",
        };
        write!(f, "{}", name)
    }
}

/// Requested cpu/mem request+limit, in millicores and MB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub cpu_request_m: u32,
    pub mem_request_mb: u32,
    pub cpu_limit_m: u32,
    pub mem_limit_mb: u32,
}

/// Operation-specific payload, one closed variant per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeSpec {
    Scale {
        replicas: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resources: Option<ResourceQuota>,
    },
    Restart,
    ImageUpdate {
        image: String,
    },
    CronScale {
        schedule: String,
        replicas: u32,
    },
}

impl ChangeSpec {
    pub fn kind(&self) -> OperationKind {
        match self {
            ChangeSpec::Scale { .. } => OperationKind::Scale,
            ChangeSpec::Restart => OperationKind::Restart,
            ChangeSpec::ImageUpdate { .. } => OperationKind::ImageUpdate,
            ChangeSpec::CronScale { .. } => OperationKind::CronScale,
        }
    }
}

/// One deployment inside one cluster environment, plus the change to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTarget {
    pub env: String,
    pub namespace: String,
    pub deployment: String,
    #[serde(flatten)]
    pub change: ChangeSpec,
}

/// One user-initiated action; immutable once dispatch begins
#[derive(Debug, Clone, Serialize)]
pub struct BatchOperation {
    pub kind: OperationKind,
    pub env: String,
    pub add_label: bool,
    pub interval_ms: u64,
    pub targets: Vec<ResourceTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded,
    Failed,
}

/// Why a target failed, mirroring the per-target half of the error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    AgentUnreachable,
    AgentRejected,
}

/// Per-target outcome; never mutated after creation
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    /// Position of the originating target in the submitted batch
    pub index: usize,
    pub namespace: String,
    pub deployment: String,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dispatched_at: DateTime<Utc>,
}

impl OperationResult {
    pub fn from_outcome(
        index: usize,
        target: &ResourceTarget,
        dispatched_at: DateTime<Utc>,
        outcome: Result<(), AgentCallError>,
    ) -> Self {
        let (status, cause, error) = match outcome {
            Ok(()) => (OperationStatus::Succeeded, None, None),
            Err(e) => {
                let cause = match &e {
                    AgentCallError::Unreachable { .. } => FailureCause::AgentUnreachable,
                    AgentCallError::Rejected { .. } => FailureCause::AgentRejected,
                };
                (OperationStatus::Failed, Some(cause), Some(e.to_string()))
            }
        };

        Self {
            index,
            namespace: target.namespace.clone(),
            deployment: target.deployment.clone(),
            status,
            cause,
            error,
            dispatched_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

/// Aggregate view over one `BatchOperation`, ordered 1:1 with its targets
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub results: Vec<OperationResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub status: BatchStatus,
}
