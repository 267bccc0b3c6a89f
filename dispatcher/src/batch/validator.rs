//! Structural validation of batch targets
//!
//! Validation is purely structural and performs no network access. Every
//! target is checked even after a failure so the caller sees all problems
//! at once, but a batch with any invalid target is rejected before a
//! single dispatch happens.

use super::{ChangeSpec, OperationKind, ResourceTarget};
use crate::errors::{InvalidTarget, ValidationError};

/// Validate and normalize one target against the batch kind and environment.
///
/// Normalization trims surrounding whitespace from the identifiers; the
/// payload is left untouched.
pub fn validate_target(
    index: usize,
    batch_env: &str,
    kind: OperationKind,
    target: &ResourceTarget,
) -> Result<ResourceTarget, InvalidTarget> {
    let env = target.env.trim();
    let namespace = target.namespace.trim();
    let deployment = target.deployment.trim();

    if env.is_empty() {
        return Err(invalid(index, "env", "must not be empty"));
    }
    if namespace.is_empty() {
        return Err(invalid(index, "namespace", "must not be empty"));
    }
    if deployment.is_empty() {
        return Err(invalid(index, "deployment", "must not be empty"));
    }
    if env != batch_env {
        return Err(InvalidTarget {
            index,
            field: "env".to_string(),
            reason: format!("'{}' does not match batch environment '{}'", env, batch_env),
        });
    }

    if target.change.kind() != kind {
        return Err(InvalidTarget {
            index,
            field: "kind".to_string(),
            reason: format!(
                "payload kind '{}' does not match batch kind '{}'",
                target.change.kind(),
                kind
            ),
        });
    }

    match &target.change {
        ChangeSpec::Scale { .. } | ChangeSpec::Restart => {}
        ChangeSpec::ImageUpdate { image } => {
            validate_image_reference(image).map_err(|reason| InvalidTarget {
                index,
                field: "image".to_string(),
                reason,
            })?;
        }
        ChangeSpec::CronScale { schedule, .. } => {
            validate_cron_schedule(schedule).map_err(|reason| InvalidTarget {
                index,
                field: "schedule".to_string(),
                reason,
            })?;
        }
    }

    Ok(ResourceTarget {
        env: env.to_string(),
        namespace: namespace.to_string(),
        deployment: deployment.to_string(),
        change: target.change.clone(),
    })
}

/// Validate every target of a batch; collects all problems and rejects the
/// batch as a whole when any target is malformed.
pub fn validate_batch(
    batch_env: &str,
    kind: OperationKind,
    targets: &[ResourceTarget],
) -> Result<Vec<ResourceTarget>, ValidationError> {
    if targets.is_empty() {
        return Err(ValidationError {
            problems: vec![InvalidTarget {
                index: 0,
                field: "targets".to_string(),
                reason: "batch contains no targets".to_string(),
            }],
        });
    }

    let mut normalized = Vec::with_capacity(targets.len());
    let mut problems = Vec::new();

    for (index, target) in targets.iter().enumerate() {
        match validate_target(index, batch_env, kind, target) {
            Ok(t) => normalized.push(t),
            Err(p) => problems.push(p),
        }
    }

    if problems.is_empty() {
        Ok(normalized)
    } else {
        Err(ValidationError { problems })
    }
}

/// A well-formed image reference: `[registry/]repo[:tag|@digest]`, no
/// whitespace, and at most one tag separator in the final path segment.
fn validate_image_reference(image: &str) -> Result<(), String> {
    if image.trim().is_empty() {
        return Err("image reference must not be empty".to_string());
    }
    if image.chars().any(char::is_whitespace) {
        return Err("image reference must not contain whitespace".to_string());
    }

    let reference = match image.split_once('@') {
        Some((name, digest)) => {
            if !digest.starts_with("sha256:") {
                return Err(format!("unsupported digest '{}'", digest));
            }
            name
        }
        None => image,
    };

    let last_segment = reference.rsplit('/').next().unwrap_or(reference);
    if last_segment.is_empty() {
        return Err("image reference ends with '/'".to_string());
    }
    if last_segment.matches(':').count() > 1 {
        return Err(format!("malformed tag in '{}'", last_segment));
    }
    if let Some((repo, tag)) = last_segment.split_once(':') {
        if repo.is_empty() || tag.is_empty() {
            return Err(format!("malformed tag in '{}'", last_segment));
        }
    }

    Ok(())
}

/// Validate the 6-field cron form consumed by the job scheduler:
/// second minute hour day month dayofweek.
pub fn validate_cron_schedule(schedule: &str) -> Result<(), String> {
    let parts: Vec<&str> = schedule.split_whitespace().collect();

    if parts.len() != 6 {
        return Err(format!(
            "schedule requires exactly 6 fields (sec min hour day month dow), got {}: '{}'",
            parts.len(),
            schedule
        ));
    }

    validate_cron_field(parts[0], "second", 0, 59)?;
    validate_cron_field(parts[1], "minute", 0, 59)?;
    validate_cron_field(parts[2], "hour", 0, 23)?;
    validate_cron_field(parts[3], "day", 1, 31)?;
    validate_cron_field(parts[4], "month", 1, 12)?;
    validate_cron_field(parts[5], "dayofweek", 0, 7)?;

    Ok(())
}

fn validate_cron_field(field: &str, name: &str, min: u32, max: u32) -> Result<(), String> {
    if field == "*" || field == "?" {
        return Ok(());
    }

    if field.contains('-') {
        let range: Vec<&str> = field.split('-').collect();
        if range.len() == 2 {
            let start = range[0]
                .parse::<u32>()
                .map_err(|_| format!("invalid {} range start: {}", name, range[0]))?;
            let end = range[1]
                .parse::<u32>()
                .map_err(|_| format!("invalid {} range end: {}", name, range[1]))?;

            if start < min || start > max || end < min || end > max {
                return Err(format!(
                    "{} range {}-{} is outside valid range {}-{}",
                    name, start, end, min, max
                ));
            }
            return Ok(());
        }
    }

    if field.contains(',') {
        for part in field.split(',') {
            let value = part
                .parse::<u32>()
                .map_err(|_| format!("invalid {} value in list: {}", name, part))?;
            if value < min || value > max {
                return Err(format!(
                    "{} value {} is outside valid range {}-{}",
                    name, value, min, max
                ));
            }
        }
        return Ok(());
    }

    if let Some(step_str) = field.strip_prefix("*/") {
        let step = step_str
            .parse::<u32>()
            .map_err(|_| format!("invalid {} step value: {}", name, step_str))?;
        if step == 0 {
            return Err(format!("{} step value cannot be 0", name));
        }
        return Ok(());
    }

    let value = field
        .parse::<u32>()
        .map_err(|_| format!("invalid {} value: {}", name, field))?;

    if value < min || value > max {
        return Err(format!(
            "{} value {} is outside valid range {}-{}",
            name, value, min, max
        ));
    }

    Ok(())
}

fn invalid(index: usize, field: &str, reason: &str) -> InvalidTarget {
    InvalidTarget {
        index,
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
