//! Run orchestration
//!
//! One run is a single pass over the control table:
//!
//! 1. load every policy (a store failure or a missing control column aborts the
//!    run here, before any table is touched; an unreadable row only costs its
//!    own table);
//! 2. per table, evaluate what is due, report configuration issues, then execute
//!    due operations in fixed order (analyze, optimize, expire-snapshots,
//!    remove-orphan-files), persisting `last_*_on` right after each success;
//! 3. fold every outcome into a [`RunReport`].
//!
//! Tables and operations are isolated from each other: a failed operation is
//! recorded and the run moves on. Nothing is retried within a run.

pub mod report;

use crate::core::{MaintenancePolicy, ScheduleField, StoreResult};
use crate::engine::QueryEngine;
use crate::evaluator::{Evaluation, evaluate};
use crate::executor::OperationExecutor;
use crate::store::{PolicyRow, ScheduleStore};
use chrono::NaiveDateTime;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

pub use report::{
    EXIT_FAILURES, EXIT_FATAL, OperationOutcome, OperationStatus, RunReport, TableOutcome,
    exit_status,
};

/// What a run would do for one table, without doing it. `evaluation` is
/// `Err` with the reason when the table's row could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table_name: String,
    pub evaluation: Result<Evaluation, String>,
}

pub struct MaintenanceRunner<S, E> {
    store: S,
    executor: OperationExecutor<E>,
}

impl<S: ScheduleStore, E: QueryEngine> MaintenanceRunner<S, E> {
    pub fn new(store: S, executor: OperationExecutor<E>) -> Self {
        Self { store, executor }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one maintenance pass with `now` as the run's clock reading.
    ///
    /// Returns `Err` only when the control table cannot be loaded; every
    /// per-operation problem ends up in the report instead.
    pub async fn run(&self, now: NaiveDateTime) -> StoreResult<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("maintenance.run", %run_id);
        self.run_pass(run_id, now).instrument(span).await
    }

    /// Evaluate every policy at `now` without executing anything.
    pub async fn plan(&self, now: NaiveDateTime) -> StoreResult<Vec<TablePlan>> {
        let rows = self.load().await?;
        Ok(rows
            .into_iter()
            .map(|row| match row {
                Ok(policy) => TablePlan {
                    evaluation: Ok(evaluate(&policy, now)),
                    table_name: policy.table_name,
                },
                Err(invalid) => TablePlan {
                    table_name: invalid.key,
                    evaluation: Err(invalid.reason),
                },
            })
            .collect())
    }

    async fn run_pass(&self, run_id: Uuid, now: NaiveDateTime) -> StoreResult<RunReport> {
        let rows = self.load().await?;
        info!(tables = rows.len(), "loaded maintenance policies");

        let mut report = RunReport::new(run_id, now);
        for row in &rows {
            let outcome = match row {
                Ok(policy) => {
                    let span = info_span!("maintenance.table", table = %policy.table_name);
                    self.process_table(policy, now).instrument(span).await
                }
                Err(invalid) => {
                    warn!(table = %invalid.key, reason = %invalid.reason, "skipping unreadable policy row");
                    TableOutcome::rejected(invalid.key.as_str(), invalid.reason.as_str())
                }
            };
            report.tables.push(outcome);
        }

        if report.is_success() {
            info!(succeeded = report.succeeded(), "maintenance run completed");
        } else {
            warn!(
                succeeded = report.succeeded(),
                failed = report.failed(),
                unrecorded = report.unrecorded(),
                "maintenance run completed with failures"
            );
        }
        Ok(report)
    }

    async fn load(&self) -> StoreResult<Vec<PolicyRow>> {
        self.store.load_policies().await.map_err(|err| {
            error!(error = %err, "cannot load maintenance policies");
            err
        })
    }

    async fn process_table(&self, policy: &MaintenancePolicy, now: NaiveDateTime) -> TableOutcome {
        let table_name = policy.table_name.as_str();
        let mut outcome = TableOutcome::new(table_name);

        let evaluation = evaluate(policy, now);
        if evaluation.is_idle() {
            debug!("nothing due");
            return outcome;
        }

        for issue in evaluation.issues {
            warn!(operation = %issue.kind, reason = %issue.reason, "operation misconfigured");
            outcome.record(
                issue.kind,
                OperationStatus::Misconfigured {
                    reason: issue.reason,
                },
            );
        }

        for operation in &evaluation.due {
            let kind = operation.kind();
            let status = match self.executor.execute(table_name, operation).await {
                Ok(()) => self.persist(table_name, kind.schedule_field(), now).await,
                Err(failure) => failure.into(),
            };
            outcome.record(kind, status);
        }

        outcome.operations.sort_by_key(|o| o.kind);
        outcome
    }

    async fn persist(
        &self,
        table_name: &str,
        field: Option<ScheduleField>,
        now: NaiveDateTime,
    ) -> OperationStatus {
        let Some(field) = field else {
            return OperationStatus::Succeeded;
        };

        match self.store.update_last_run(table_name, field, now).await {
            Ok(()) => {
                debug!(column = field.column(), "recorded last run");
                OperationStatus::Succeeded
            }
            Err(err) => {
                error!(
                    column = field.column(),
                    error = %err,
                    "operation succeeded but its timestamp was not recorded"
                );
                OperationStatus::Unrecorded {
                    reason: err.to_string(),
                }
            }
        }
    }
}
