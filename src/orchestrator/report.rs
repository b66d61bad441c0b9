use crate::core::{OperationFailure, OperationKind, StoreResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// What happened to one operation of one table during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded,
    /// Ran remotely, but the new timestamp could not be written back; the
    /// operation will be due again on the next run.
    Unrecorded { reason: String },
    Misconfigured { reason: String },
    Failed { reason: String },
}

impl OperationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Unrecorded { .. } => "unrecorded",
            Self::Misconfigured { .. } => "misconfigured",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Succeeded => None,
            Self::Unrecorded { reason }
            | Self::Misconfigured { reason }
            | Self::Failed { reason } => Some(reason),
        }
    }
}

impl From<OperationFailure> for OperationStatus {
    fn from(failure: OperationFailure) -> Self {
        match failure {
            OperationFailure::Misconfigured(reason) => Self::Misconfigured { reason },
            OperationFailure::Remote(err) => Self::Failed {
                reason: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    #[serde(flatten)]
    pub status: OperationStatus,
}

/// Exit status when some operation or row did not succeed.
pub const EXIT_FAILURES: u8 = 1;
/// Exit status when the run could not get past loading the control table.
pub const EXIT_FATAL: u8 = 2;

/// Map a run to the process exit status: 0 when everything succeeded.
pub fn exit_status(outcome: &StoreResult<RunReport>) -> u8 {
    match outcome {
        Ok(report) if report.is_success() => 0,
        Ok(_) => EXIT_FAILURES,
        Err(_) => EXIT_FATAL,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutcome {
    pub table_name: String,
    /// Set when the control-table row itself could not be read; nothing ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misconfigured: Option<String>,
    pub operations: Vec<OperationOutcome>,
}

impl TableOutcome {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            misconfigured: None,
            operations: Vec::new(),
        }
    }

    pub fn rejected(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            misconfigured: Some(reason.into()),
            ..Self::new(key)
        }
    }

    pub fn record(&mut self, kind: OperationKind, status: OperationStatus) {
        self.operations.push(OperationOutcome { kind, status });
    }

    pub fn status_of(&self, kind: OperationKind) -> Option<&OperationStatus> {
        self.operations
            .iter()
            .find(|outcome| outcome.kind == kind)
            .map(|outcome| &outcome.status)
    }
}

/// Aggregate result of one maintenance run; the only thing a run hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: NaiveDateTime,
    pub tables: Vec<TableOutcome>,
}

impl RunReport {
    pub fn new(run_id: Uuid, started_at: NaiveDateTime) -> Self {
        Self {
            run_id,
            started_at,
            tables: Vec::new(),
        }
    }

    fn outcomes(&self) -> impl Iterator<Item = (&str, &OperationOutcome)> {
        self.tables.iter().flat_map(|table| {
            table
                .operations
                .iter()
                .map(move |outcome| (table.table_name.as_str(), outcome))
        })
    }

    pub fn table(&self, table_name: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes().filter(|(_, o)| o.status.is_success()).count()
    }

    /// Rows that could not be read as a policy.
    pub fn rejected(&self) -> impl Iterator<Item = &TableOutcome> {
        self.tables.iter().filter(|t| t.misconfigured.is_some())
    }

    /// Failed or misconfigured operations, plus unreadable rows.
    pub fn failed(&self) -> usize {
        let operations = self
            .outcomes()
            .filter(|(_, o)| {
                matches!(
                    o.status,
                    OperationStatus::Failed { .. } | OperationStatus::Misconfigured { .. }
                )
            })
            .count();
        operations + self.rejected().count()
    }

    pub fn unrecorded(&self) -> usize {
        self.outcomes()
            .filter(|(_, o)| matches!(o.status, OperationStatus::Unrecorded { .. }))
            .count()
    }

    /// Every operation outcome that was not a clean success, with its table.
    /// Unreadable rows are listed by [`RunReport::rejected`].
    pub fn failures(&self) -> Vec<(&str, &OperationOutcome)> {
        self.outcomes().filter(|(_, o)| !o.status.is_success()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.rejected().next().is_none() && self.outcomes().all(|(_, o)| o.status.is_success())
    }

    /// One-line headline of the run.
    pub fn summary(&self) -> String {
        format!(
            "maintenance run {} at {}: {} succeeded, {} failed, {} unrecorded across {} table(s)",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.succeeded(),
            self.failed(),
            self.unrecorded(),
            self.tables.len()
        )
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;

        for table in &self.tables {
            if let Some(reason) = &table.misconfigured {
                writeln!(f, "  {}: misconfigured ({})", table.table_name, reason)?;
                continue;
            }
            if table.operations.is_empty() {
                writeln!(f, "  {}: nothing due", table.table_name)?;
                continue;
            }
            writeln!(f, "  {}:", table.table_name)?;
            for outcome in &table.operations {
                match outcome.status.reason() {
                    Some(reason) => writeln!(
                        f,
                        "    {}: {} ({})",
                        outcome.kind,
                        outcome.status.label(),
                        reason
                    )?,
                    None => writeln!(f, "    {}: {}", outcome.kind, outcome.status.label())?,
                }
            }
        }

        Ok(())
    }
}
