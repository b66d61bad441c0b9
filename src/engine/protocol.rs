//! Trino client protocol payloads
//!
//! A statement is submitted with `POST /v1/statement`; the coordinator answers
//! with a page that may carry column metadata, a batch of rows, an error, and a
//! `nextUri` to poll for the rest. [`ResultCollector`] folds those pages into a
//! [`QueryResult`], converting JSON cells by their declared column type.

use crate::core::value::parse_timestamp;
use crate::core::{Column, DataType, EngineError, EngineResult, Row, Value};
use crate::result::QueryResult;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementPage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub next_uri: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<ColumnSpec>>,
    #[serde(default)]
    pub data: Option<Vec<Vec<JsonValue>>>,
    #[serde(default)]
    pub error: Option<QueryFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFailure {
    pub message: String,
    #[serde(default)]
    pub error_name: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

impl From<QueryFailure> for EngineError {
    fn from(failure: QueryFailure) -> Self {
        let name = failure
            .error_name
            .or(failure.error_type)
            .unwrap_or_else(|| "UNKNOWN".to_string());
        EngineError::remote(name, failure.message)
    }
}

/// Accumulates result pages of a single statement.
#[derive(Debug, Default)]
pub struct ResultCollector {
    columns: Option<Vec<Column>>,
    rows: Vec<Row>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one page in. Returns the URI to poll next, or `None` once the
    /// statement has finished.
    pub fn absorb(&mut self, page: StatementPage) -> EngineResult<Option<String>> {
        if let Some(error) = page.error {
            return Err(error.into());
        }

        if self.columns.is_none() {
            if let Some(specs) = page.columns {
                self.columns = Some(
                    specs
                        .into_iter()
                        .map(|spec| Column::new(spec.name, DataType::from_trino(&spec.type_signature)))
                        .collect(),
                );
            }
        }

        if let Some(data) = page.data {
            let columns = self.columns.as_ref().ok_or_else(|| {
                EngineError::Protocol("received rows before column metadata".into())
            })?;

            for raw in data {
                if raw.len() != columns.len() {
                    return Err(EngineError::Protocol(format!(
                        "row has {} cells, expected {}",
                        raw.len(),
                        columns.len()
                    )));
                }
                let row = raw
                    .iter()
                    .zip(columns)
                    .map(|(cell, column)| convert(cell, &column.data_type))
                    .collect::<EngineResult<Row>>()?;
                self.rows.push(row);
            }
        }

        Ok(page.next_uri)
    }

    pub fn finish(self) -> QueryResult {
        let columns = self
            .columns
            .unwrap_or_default()
            .into_iter()
            .map(|column| column.name)
            .collect();
        QueryResult::new(columns, self.rows)
    }
}

/// Convert a single JSON cell to a [`Value`].
pub fn convert(cell: &JsonValue, expected: &DataType) -> EngineResult<Value> {
    match (cell, expected) {
        (JsonValue::Null, _) => Ok(Value::Null),

        (JsonValue::Bool(b), DataType::Boolean) => Ok(Value::Boolean(*b)),

        (JsonValue::Number(n), DataType::Integer) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| mismatch(cell, expected)),

        (JsonValue::Number(n), DataType::Float) => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| mismatch(cell, expected)),

        // decimals and non-finite doubles arrive as strings
        (JsonValue::String(s), DataType::Float) => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| mismatch(cell, expected)),

        (JsonValue::String(s), DataType::Timestamp) => parse_timestamp(s)
            .map(Value::Timestamp)
            .ok_or_else(|| mismatch(cell, expected)),

        (JsonValue::Array(items), DataType::Array(inner)) => items
            .iter()
            .map(|item| convert(item, inner))
            .collect::<EngineResult<Vec<_>>>()
            .map(Value::Array),

        (JsonValue::String(s), DataType::Text | DataType::Other(_)) => Ok(Value::Text(s.clone())),

        (_, DataType::Text | DataType::Other(_)) => Ok(Value::Text(cell.to_string())),

        _ => Err(mismatch(cell, expected)),
    }
}

fn mismatch(cell: &JsonValue, expected: &DataType) -> EngineError {
    EngineError::Protocol(format!("cannot read {} as {}", cell, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: JsonValue) -> StatementPage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_collects_rows_across_pages() {
        let mut collector = ResultCollector::new();

        let next = collector
            .absorb(page(json!({
                "id": "q1",
                "nextUri": "http://coordinator/v1/statement/q1/1",
                "columns": [
                    {"name": "table_name", "type": "varchar"},
                    {"name": "should_analyze", "type": "integer"},
                    {"name": "last_analyzed_on", "type": "timestamp(6)"},
                    {"name": "columns_to_analyze", "type": "array(varchar)"}
                ],
                "data": [["orders", 1, null, ["a", "b"]]]
            })))
            .unwrap();
        assert_eq!(next.as_deref(), Some("http://coordinator/v1/statement/q1/1"));

        let next = collector
            .absorb(page(json!({
                "id": "q1",
                "data": [["events", 0, "2024-01-03 10:00:00.000000", null]],
                "stats": {"state": "FINISHED"}
            })))
            .unwrap();
        assert_eq!(next, None);

        let result = collector.finish();
        assert_eq!(result.columns.len(), 4);
        assert_eq!(result.row_count(), 2);
        assert_eq!(
            result.rows[0][3],
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
        assert!(matches!(result.rows[1][2], Value::Timestamp(_)));
    }

    #[test]
    fn test_error_page_becomes_remote_error() {
        let mut collector = ResultCollector::new();
        let err = collector
            .absorb(page(json!({
                "id": "q2",
                "error": {
                    "message": "line 1:15: Table 'iceberg.default.missing' does not exist",
                    "errorName": "TABLE_NOT_FOUND",
                    "errorType": "USER_ERROR"
                }
            })))
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::remote(
                "TABLE_NOT_FOUND",
                "line 1:15: Table 'iceberg.default.missing' does not exist"
            )
        );
    }

    #[test]
    fn test_rows_without_columns_are_rejected() {
        let mut collector = ResultCollector::new();
        let err = collector
            .absorb(page(json!({"id": "q3", "data": [[1]]})))
            .unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn test_convert_by_declared_type() {
        assert_eq!(convert(&json!(7), &DataType::Integer).unwrap(), Value::Integer(7));
        assert_eq!(convert(&json!("1.50"), &DataType::Float).unwrap(), Value::Float(1.5));
        assert_eq!(convert(&json!(true), &DataType::Boolean).unwrap(), Value::Boolean(true));
        assert_eq!(
            convert(&json!({"k": 1}), &DataType::Other("map(varchar, integer)".into())).unwrap(),
            Value::Text("{\"k\":1}".into())
        );
        assert!(convert(&json!("x"), &DataType::Integer).is_err());
    }
}
