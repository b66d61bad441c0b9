//! Due-task evaluation
//!
//! Pure mapping from a [`MaintenancePolicy`] and the run's clock reading to the
//! operations that should run now. Each kind is judged on its own:
//!
//! - analyze / optimize are due when enabled and either never ran or their
//!   interval in days has fully elapsed (`now - last >= interval`);
//! - expire-snapshots / remove-orphan-files are due on every run when enabled.
//!
//! An enabled operation whose interval or retention is missing, negative or
//! out of range is never due; it is reported as a [`ConfigurationIssue`] instead.

use crate::core::{DueOperation, MaintenancePolicy, OperationKind};
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// In run order: analyze, optimize, expire-snapshots, remove-orphan-files.
    pub due: Vec<DueOperation>,
    pub issues: Vec<ConfigurationIssue>,
}

impl Evaluation {
    pub fn is_idle(&self) -> bool {
        self.due.is_empty() && self.issues.is_empty()
    }

    pub fn due_kinds(&self) -> Vec<OperationKind> {
        self.due.iter().map(DueOperation::kind).collect()
    }
}

/// An enabled operation that cannot run because its policy row is incomplete or invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationIssue {
    pub kind: OperationKind,
    pub reason: String,
}

impl fmt::Display for ConfigurationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

pub fn evaluate(policy: &MaintenancePolicy, now: NaiveDateTime) -> Evaluation {
    let mut evaluation = Evaluation::default();

    for kind in OperationKind::ALL {
        match decide(policy, kind, now) {
            Ok(Some(operation)) => evaluation.due.push(operation),
            Ok(None) => {}
            Err(reason) => evaluation.issues.push(ConfigurationIssue { kind, reason }),
        }
    }

    evaluation
}

fn decide(
    policy: &MaintenancePolicy,
    kind: OperationKind,
    now: NaiveDateTime,
) -> Result<Option<DueOperation>, String> {
    match kind {
        OperationKind::Analyze => {
            if !policy.should_analyze {
                return Ok(None);
            }
            let every = interval(policy.days_to_analyze, "days_to_analyze")?;
            Ok(elapsed(policy.last_analyzed_on, every, now).then(|| DueOperation::Analyze {
                columns: policy.columns_to_analyze.clone(),
            }))
        }
        OperationKind::Optimize => {
            if !policy.should_optimize {
                return Ok(None);
            }
            let every = interval(policy.days_to_optimize, "days_to_optimize")?;
            Ok(elapsed(policy.last_optimized_on, every, now).then_some(DueOperation::Optimize))
        }
        OperationKind::ExpireSnapshots => {
            if !policy.should_expire_snapshots {
                return Ok(None);
            }
            let retention_days = retention(policy.retention_days_snapshots, "retention_days_snapshots")?;
            Ok(Some(DueOperation::ExpireSnapshots { retention_days }))
        }
        OperationKind::RemoveOrphanFiles => {
            if !policy.should_remove_orphan_files {
                return Ok(None);
            }
            let retention_days =
                retention(policy.retention_days_orphan_files, "retention_days_orphan_files")?;
            Ok(Some(DueOperation::RemoveOrphanFiles { retention_days }))
        }
    }
}

fn interval(days: Option<i64>, column: &str) -> Result<TimeDelta, String> {
    let days = days.ok_or_else(|| format!("{} is not set", column))?;
    if days < 0 {
        return Err(format!("{} is negative ({})", column, days));
    }
    TimeDelta::try_days(days).ok_or_else(|| format!("{} is out of range ({})", column, days))
}

fn retention(days: Option<i64>, column: &str) -> Result<u32, String> {
    let days = days.ok_or_else(|| format!("{} is not set", column))?;
    if days < 0 {
        return Err(format!("{} is negative ({})", column, days));
    }
    u32::try_from(days).map_err(|_| format!("{} is out of range ({})", column, days))
}

/// Zero-day intervals are always elapsed, even against a last run stamped in
/// the future. Any other interval never elapses against a future last run.
fn elapsed(last: Option<NaiveDateTime>, every: TimeDelta, now: NaiveDateTime) -> bool {
    if every.is_zero() {
        return true;
    }
    match last {
        None => true,
        Some(last) => now.signed_duration_since(last) >= every,
    }
}
