// ============================================================================
// Iceberg Maintenance Library
// ============================================================================
//
// Reads per-table maintenance policies from a control table, decides which
// operations are due, runs them through the query engine and records when
// they last ran.

pub mod config;
pub mod core;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod orchestrator;
pub mod result;
pub mod sql;
pub mod store;

// Re-export main types for convenience
pub use config::AppConfig;
pub use core::{
    DueOperation, EngineError, EngineResult, MaintenancePolicy, OperationFailure, OperationKind,
    ScheduleField, StoreError, StoreResult, Value,
};
pub use engine::{ConnectionConfig, QueryEngine, TrinoClient};
pub use evaluator::{ConfigurationIssue, Evaluation, evaluate};
pub use executor::OperationExecutor;
pub use orchestrator::{
    EXIT_FAILURES, EXIT_FATAL, MaintenanceRunner, OperationOutcome, OperationStatus, RunReport,
    TableOutcome, TablePlan, exit_status,
};
pub use result::QueryResult;
pub use store::{InvalidRow, MemoryScheduleStore, PolicyRow, ScheduleStore, SqlScheduleStore};
