#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use iceberg_maintenance::core::{
    EngineError, EngineResult, MaintenancePolicy, ScheduleField, StoreError, StoreResult,
};
use iceberg_maintenance::{MemoryScheduleStore, PolicyRow, QueryEngine, QueryResult, ScheduleStore};
use std::sync::Mutex;

pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Engine that records every statement and answers from a script.
///
/// Rules match on a substring of the statement; the first matching rule wins.
/// Unmatched statements succeed with an empty result.
#[derive(Default)]
pub struct ScriptedEngine {
    statements: Mutex<Vec<String>>,
    rules: Vec<(String, EngineResult<QueryResult>)>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, pattern: &str, error: EngineError) -> Self {
        self.rules.push((pattern.to_string(), Err(error)));
        self
    }

    pub fn respond(mut self, pattern: &str, result: QueryResult) -> Self {
        self.rules.push((pattern.to_string(), Ok(result)));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn execute(&self, sql: &str) -> EngineResult<QueryResult> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.rules
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Ok(QueryResult::empty()))
    }
}

/// In-memory control table whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryScheduleStore,
    pub fail_load: bool,
    pub fail_updates: bool,
}

impl FlakyStore {
    pub fn new(policies: impl IntoIterator<Item = MaintenancePolicy>) -> Self {
        Self {
            inner: MemoryScheduleStore::with_policies(policies),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ScheduleStore for FlakyStore {
    async fn load_policies(&self) -> StoreResult<Vec<PolicyRow>> {
        if self.fail_load {
            return Err(StoreError::Unavailable(EngineError::Unavailable(
                "connection refused".into(),
            )));
        }
        self.inner.load_policies().await
    }

    async fn update_last_run(
        &self,
        table_name: &str,
        field: ScheduleField,
        at: NaiveDateTime,
    ) -> StoreResult<()> {
        if self.fail_updates {
            return Err(StoreError::Unavailable(EngineError::remote(
                "TRANSACTION_CONFLICT",
                "concurrent update",
            )));
        }
        self.inner.update_last_run(table_name, field, at).await
    }
}
