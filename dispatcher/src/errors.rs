//! Custom error types for the operation dispatcher
//!
//! Provides the closed error taxonomy for batch dispatch: errors detected
//! before any dispatch reject the whole batch, while per-target agent
//! failures are recorded inside the batch result and never surface here.

use std::fmt;

/// Errors that reject an entire batch before any target is dispatched
#[derive(Debug, Clone)]
pub enum DispatchError {
    /// One or more targets failed structural validation
    Validation(ValidationError),

    /// The batch environment is not present in the environment table
    UnknownEnvironment { env: String },

    /// Fixed-node pinning was requested but the admission flag store
    /// could not be consulted
    AdmissionCheckUnavailable {
        env: String,
        namespace: String,
        reason: String,
    },

    /// Cron scheduling backend failure while registering an entry
    ScheduleFailed { reason: String },
}

/// A single malformed or incomplete target, identified by its position
/// in the submitted batch
#[derive(Debug, Clone)]
pub struct InvalidTarget {
    pub index: usize,
    pub field: String,
    pub reason: String,
}

/// Collected validation failures for a batch; every target is checked so
/// the caller sees all problems at once
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub problems: Vec<InvalidTarget>,
}

/// Per-target agent call failure variants
///
/// These never abort a batch; they are carried inside the corresponding
/// `OperationResult`.
#[derive(Debug, Clone)]
pub enum AgentCallError {
    /// Transport failure or per-call timeout reaching the environment agent
    Unreachable { env: String, reason: String },

    /// The agent answered but rejected the change semantically
    Rejected { env: String, message: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Validation(e) => write!(f, "Batch validation failed: {}", e),
            DispatchError::UnknownEnvironment { env } => {
                write!(f, "Environment '{}' is not configured", env)
            }
            DispatchError::AdmissionCheckUnavailable {
                env,
                namespace,
                reason,
            } => {
                write!(
                    f,
                    "Admission flag lookup failed for '{}/{}': {}",
                    env, namespace, reason
                )
            }
            DispatchError::ScheduleFailed { reason } => {
                write!(f, "Failed to register schedule: {}", reason)
            }
        }
    }
}

impl fmt::Display for InvalidTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target[{}] field '{}': {}",
            self.index, self.field, self.reason
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.problems.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl fmt::Display for AgentCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentCallError::Unreachable { env, reason } => {
                write!(f, "Agent for '{}' unreachable: {}", env, reason)
            }
            AgentCallError::Rejected { env, message } => {
                write!(f, "Agent for '{}' rejected the change: {}", env, message)
            }
        }
    }
}

impl std::error::Error for DispatchError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for AgentCallError {}

impl From<ValidationError> for DispatchError {
    fn from(err: ValidationError) -> Self {
        DispatchError::Validation(err)
    }
}
