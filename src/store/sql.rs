use super::{InvalidRow, PolicyRow, ScheduleStore};
use crate::core::{MaintenancePolicy, Row, ScheduleField, StoreError, StoreResult, Value};
use crate::engine::QueryEngine;
use crate::result::QueryResult;
use crate::sql::{quote_literal, table_reference, timestamp_literal};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::debug;

pub const DEFAULT_CONTROL_TABLE: &str = "iceberg_maintenance_schedule";

/// Columns a control table must have. Anything else is ignored.
pub const CONTROL_COLUMNS: [&str; 12] = [
    "table_name",
    "should_analyze",
    "last_analyzed_on",
    "days_to_analyze",
    "columns_to_analyze",
    "should_optimize",
    "last_optimized_on",
    "days_to_optimize",
    "should_expire_snapshots",
    "retention_days_snapshots",
    "should_remove_orphan_files",
    "retention_days_orphan_files",
];

/// Control table living in the engine itself, read and written with SQL.
pub struct SqlScheduleStore<E> {
    engine: E,
    table: String,
}

impl<E: QueryEngine> SqlScheduleStore<E> {
    pub fn new(engine: E, table: impl Into<String>) -> StoreResult<Self> {
        let table = table.into();
        table_reference(&table).map_err(StoreError::Schema)?;
        Ok(Self { engine, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table_statement(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                table_name VARCHAR NOT NULL,\n    \
                should_analyze INTEGER,\n    \
                last_analyzed_on TIMESTAMP(6),\n    \
                days_to_analyze INTEGER,\n    \
                columns_to_analyze ARRAY(VARCHAR),\n    \
                should_optimize INTEGER,\n    \
                last_optimized_on TIMESTAMP(6),\n    \
                days_to_optimize INTEGER,\n    \
                should_expire_snapshots INTEGER,\n    \
                retention_days_snapshots INTEGER,\n    \
                should_remove_orphan_files INTEGER,\n    \
                retention_days_orphan_files INTEGER\n\
            )",
            self.table
        )
    }

    /// Create the control table if it does not exist yet.
    pub async fn ensure_control_table(&self) -> StoreResult<()> {
        debug!(table = %self.table, "ensuring control table");
        self.engine.execute(&self.create_table_statement()).await?;
        Ok(())
    }

    pub fn update_statement(&self, table_name: &str, field: ScheduleField, at: &NaiveDateTime) -> String {
        format!(
            "UPDATE {} SET {} = {} WHERE table_name = {}",
            self.table,
            field.column(),
            timestamp_literal(at),
            quote_literal(table_name)
        )
    }
}

#[async_trait]
impl<E: QueryEngine> ScheduleStore for SqlScheduleStore<E> {
    async fn load_policies(&self) -> StoreResult<Vec<PolicyRow>> {
        let result = self
            .engine
            .execute(&format!("SELECT * FROM {}", self.table))
            .await?;
        decode_policies(&result)
    }

    async fn update_last_run(
        &self,
        table_name: &str,
        field: ScheduleField,
        at: NaiveDateTime,
    ) -> StoreResult<()> {
        self.engine
            .execute(&self.update_statement(table_name, field, &at))
            .await?;
        Ok(())
    }
}

/// Turn a `SELECT *` over the control table into policy rows.
///
/// A missing required column fails the whole load. A row that cannot be read
/// fails on its own, keyed by its table name when that much is readable.
pub fn decode_policies(result: &QueryResult) -> StoreResult<Vec<PolicyRow>> {
    let missing = result.missing_columns(&CONTROL_COLUMNS);
    if !missing.is_empty() {
        return Err(StoreError::Schema(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(result
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let reader = RowReader { result, row, index };
            reader.policy().map_err(|reason| InvalidRow {
                key: reader.key(),
                reason,
            })
        })
        .collect())
}

struct RowReader<'a> {
    result: &'a QueryResult,
    row: &'a Row,
    index: usize,
}

impl RowReader<'_> {
    fn policy(&self) -> Result<MaintenancePolicy, String> {
        let table_name = match self.cell("table_name")? {
            Value::Text(name) if !name.is_empty() => name.clone(),
            other => return Err(self.invalid("table_name", other)),
        };

        Ok(MaintenancePolicy {
            table_name,
            should_analyze: self.flag("should_analyze")?,
            last_analyzed_on: self.timestamp("last_analyzed_on")?,
            days_to_analyze: self.integer("days_to_analyze")?,
            columns_to_analyze: self.strings("columns_to_analyze")?,
            should_optimize: self.flag("should_optimize")?,
            last_optimized_on: self.timestamp("last_optimized_on")?,
            days_to_optimize: self.integer("days_to_optimize")?,
            should_expire_snapshots: self.flag("should_expire_snapshots")?,
            retention_days_snapshots: self.integer("retention_days_snapshots")?,
            should_remove_orphan_files: self.flag("should_remove_orphan_files")?,
            retention_days_orphan_files: self.integer("retention_days_orphan_files")?,
        })
    }

    fn key(&self) -> String {
        match self.cell("table_name") {
            Ok(Value::Text(name)) if !name.is_empty() => name.clone(),
            _ => format!("row {}", self.index),
        }
    }

    fn cell(&self, column: &str) -> Result<&Value, String> {
        self.result
            .column_index(column)
            .and_then(|i| self.row.get(i))
            .ok_or_else(|| format!("no value for column '{}'", column))
    }

    fn invalid(&self, column: &str, value: &Value) -> String {
        format!(
            "column '{}' holds unreadable {} value '{}'",
            column,
            value.type_name(),
            value
        )
    }

    fn flag(&self, column: &str) -> Result<bool, String> {
        let value = self.cell(column)?;
        value.as_flag().ok_or_else(|| self.invalid(column, value))
    }

    fn integer(&self, column: &str) -> Result<Option<i64>, String> {
        let value = self.cell(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value.as_i64().map(Some).ok_or_else(|| self.invalid(column, value))
    }

    fn timestamp(&self, column: &str) -> Result<Option<NaiveDateTime>, String> {
        let value = self.cell(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_timestamp()
            .map(Some)
            .ok_or_else(|| self.invalid(column, value))
    }

    fn strings(&self, column: &str) -> Result<Vec<String>, String> {
        let value = self.cell(column)?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        let items = value.as_array().ok_or_else(|| self.invalid(column, value))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(column, item))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn full_columns() -> Vec<String> {
        CONTROL_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn orders_row() -> Row {
        vec![
            Value::from("orders"),
            Value::Integer(1),
            Value::Null,
            Value::Integer(7),
            Value::Null,
            Value::Integer(0),
            Value::Null,
            Value::Null,
            Value::Boolean(true),
            Value::Integer(30),
            Value::Null,
            Value::Null,
        ]
    }

    #[test]
    fn test_decode_integer_toggles_and_nulls() {
        let result = QueryResult::new(full_columns(), vec![orders_row()]);

        let policies = decode_policies(&result).unwrap();

        assert_eq!(
            policies,
            vec![Ok(MaintenancePolicy::new("orders").analyze_every(7).expire_snapshots(30))]
        );
    }

    #[test]
    fn test_decode_ignores_extra_columns_and_order() {
        let mut columns = full_columns();
        columns.reverse();
        columns.push("owner".into());
        let mut row = orders_row();
        row.reverse();
        row.push(Value::from("data-platform"));
        row[CONTROL_COLUMNS.len() - 1 - 4] = Value::Array(vec![Value::from("a")]);
        row[CONTROL_COLUMNS.len() - 1 - 2] = Value::Text("2024-01-03 10:00:00.000000".into());

        let policies = decode_policies(&QueryResult::new(columns, vec![row])).unwrap();
        let policy = policies[0].as_ref().unwrap();

        assert_eq!(policy.columns_to_analyze, vec!["a"]);
        assert_eq!(
            policy.last_analyzed_on,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(10, 0, 0)
        );
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let columns = full_columns()
            .into_iter()
            .filter(|c| c != "days_to_optimize")
            .collect();

        let err = decode_policies(&QueryResult::new(columns, Vec::new())).unwrap_err();

        assert!(matches!(err, StoreError::Schema(msg) if msg.contains("days_to_optimize")));
    }

    #[test]
    fn test_bad_rows_fail_alone() {
        let mut nameless = orders_row();
        nameless[0] = Value::Null;
        let mut unreadable = orders_row();
        unreadable[0] = Value::from("events");
        unreadable[3] = Value::from("weekly");
        let short = vec![Value::from("ledger")];

        let policies = decode_policies(&QueryResult::new(
            full_columns(),
            vec![orders_row(), nameless, unreadable, short],
        ))
        .unwrap();

        assert_eq!(policies.len(), 4);
        assert_eq!(policies[0].as_ref().map(|p| p.table_name.as_str()), Ok("orders"));

        let nameless = policies[1].as_ref().unwrap_err();
        assert_eq!(nameless.key, "row 1");
        assert!(nameless.reason.contains("table_name"));

        let unreadable = policies[2].as_ref().unwrap_err();
        assert_eq!(unreadable.key, "events");
        assert!(unreadable.reason.contains("days_to_analyze"));

        let short = policies[3].as_ref().unwrap_err();
        assert_eq!(short.key, "ledger");
        assert!(short.reason.contains("should_analyze"));
    }
}
