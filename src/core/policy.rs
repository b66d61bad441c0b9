use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the control table: which maintenance a table gets and how often.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaintenancePolicy {
    pub table_name: String,
    pub should_analyze: bool,
    pub last_analyzed_on: Option<NaiveDateTime>,
    pub days_to_analyze: Option<i64>,
    pub columns_to_analyze: Vec<String>,
    pub should_optimize: bool,
    pub last_optimized_on: Option<NaiveDateTime>,
    pub days_to_optimize: Option<i64>,
    pub should_expire_snapshots: bool,
    pub retention_days_snapshots: Option<i64>,
    pub should_remove_orphan_files: bool,
    pub retention_days_orphan_files: Option<i64>,
}

impl MaintenancePolicy {
    /// A policy with every operation switched off.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    pub fn analyze_every(mut self, days: i64) -> Self {
        self.should_analyze = true;
        self.days_to_analyze = Some(days);
        self
    }

    pub fn analyze_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_to_analyze = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn optimize_every(mut self, days: i64) -> Self {
        self.should_optimize = true;
        self.days_to_optimize = Some(days);
        self
    }

    pub fn expire_snapshots(mut self, retention_days: i64) -> Self {
        self.should_expire_snapshots = true;
        self.retention_days_snapshots = Some(retention_days);
        self
    }

    pub fn remove_orphan_files(mut self, retention_days: i64) -> Self {
        self.should_remove_orphan_files = true;
        self.retention_days_orphan_files = Some(retention_days);
        self
    }

    pub fn last_analyzed_on(mut self, at: NaiveDateTime) -> Self {
        self.last_analyzed_on = Some(at);
        self
    }

    pub fn last_optimized_on(mut self, at: NaiveDateTime) -> Self {
        self.last_optimized_on = Some(at);
        self
    }

    pub fn last_run(&self, field: ScheduleField) -> Option<NaiveDateTime> {
        match field {
            ScheduleField::LastAnalyzedOn => self.last_analyzed_on,
            ScheduleField::LastOptimizedOn => self.last_optimized_on,
        }
    }

    pub fn set_last_run(&mut self, field: ScheduleField, at: NaiveDateTime) {
        match field {
            ScheduleField::LastAnalyzedOn => self.last_analyzed_on = Some(at),
            ScheduleField::LastOptimizedOn => self.last_optimized_on = Some(at),
        }
    }
}

/// The four maintenance operations, in the order a run attempts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Analyze,
    Optimize,
    ExpireSnapshots,
    RemoveOrphanFiles,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Analyze,
        OperationKind::Optimize,
        OperationKind::ExpireSnapshots,
        OperationKind::RemoveOrphanFiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Optimize => "optimize",
            Self::ExpireSnapshots => "expire_snapshots",
            Self::RemoveOrphanFiles => "remove_orphan_files",
        }
    }

    /// Control-table column recording the last successful run, if the kind has one.
    pub fn schedule_field(&self) -> Option<ScheduleField> {
        match self {
            Self::Analyze => Some(ScheduleField::LastAnalyzedOn),
            Self::Optimize => Some(ScheduleField::LastOptimizedOn),
            Self::ExpireSnapshots | Self::RemoveOrphanFiles => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp columns the runner writes back after a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleField {
    LastAnalyzedOn,
    LastOptimizedOn,
}

impl ScheduleField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::LastAnalyzedOn => "last_analyzed_on",
            Self::LastOptimizedOn => "last_optimized_on",
        }
    }
}

/// An operation the evaluator decided to run, with the arguments it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueOperation {
    /// Empty `columns` means all columns.
    Analyze { columns: Vec<String> },
    Optimize,
    ExpireSnapshots { retention_days: u32 },
    RemoveOrphanFiles { retention_days: u32 },
}

impl DueOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Analyze { .. } => OperationKind::Analyze,
            Self::Optimize => OperationKind::Optimize,
            Self::ExpireSnapshots { .. } => OperationKind::ExpireSnapshots,
            Self::RemoveOrphanFiles { .. } => OperationKind::RemoveOrphanFiles,
        }
    }
}

impl fmt::Display for DueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyze { columns } if columns.is_empty() => write!(f, "analyze (all columns)"),
            Self::Analyze { columns } => write!(f, "analyze ({})", columns.join(", ")),
            Self::Optimize => write!(f, "optimize"),
            Self::ExpireSnapshots { retention_days } => {
                write!(f, "expire_snapshots (retention {}d)", retention_days)
            }
            Self::RemoveOrphanFiles { retention_days } => {
                write!(f, "remove_orphan_files (retention {}d)", retention_days)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_builder_sets_toggles() {
        let policy = MaintenancePolicy::new("orders")
            .analyze_every(7)
            .analyze_columns(["a", "b"])
            .expire_snapshots(30);

        assert!(policy.should_analyze);
        assert_eq!(policy.days_to_analyze, Some(7));
        assert_eq!(policy.columns_to_analyze, vec!["a", "b"]);
        assert!(policy.should_expire_snapshots);
        assert!(!policy.should_optimize);
        assert!(!policy.should_remove_orphan_files);
    }

    #[test]
    fn test_set_last_run_touches_one_field() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut policy = MaintenancePolicy::new("orders").optimize_every(3);
        let before = policy.clone();

        policy.set_last_run(ScheduleField::LastOptimizedOn, at);

        assert_eq!(policy.last_optimized_on, Some(at));
        assert_eq!(policy.last_analyzed_on, None);
        assert_eq!(
            MaintenancePolicy {
                last_optimized_on: None,
                ..policy
            },
            before
        );
    }

    #[test]
    fn test_kind_order_and_fields() {
        assert_eq!(
            OperationKind::ALL.map(|k| k.as_str()),
            ["analyze", "optimize", "expire_snapshots", "remove_orphan_files"]
        );
        assert_eq!(
            OperationKind::Analyze.schedule_field(),
            Some(ScheduleField::LastAnalyzedOn)
        );
        assert_eq!(OperationKind::ExpireSnapshots.schedule_field(), None);
    }
}
