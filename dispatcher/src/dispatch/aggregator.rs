//! Batch result assembly
//!
//! Folds the per-target outcomes, already in dispatch order, into one
//! `BatchResult` with derived counts and overall status. No side effects.
//! An empty outcome set (batch cancelled before the first dispatch) reports
//! `all_succeeded`: nothing was attempted, so nothing failed.

use crate::batch::{BatchResult, BatchStatus, OperationResult};

pub fn aggregate(results: Vec<OperationResult>) -> BatchResult {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - succeeded;

    let status = if failed == 0 {
        BatchStatus::AllSucceeded
    } else if succeeded == 0 {
        BatchStatus::AllFailed
    } else {
        BatchStatus::PartialFailure
    };

    BatchResult {
        results,
        succeeded,
        failed,
        status,
    }
}
