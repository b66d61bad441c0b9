use crate::core::Row;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively as the engine folds
    /// unquoted identifiers.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Names from `required` that the result does not carry.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_column_lookup_ignores_case() {
        let result = QueryResult::new(
            vec!["TABLE_NAME".into(), "should_analyze".into()],
            vec![vec![Value::from("orders"), Value::Integer(1)]],
        );

        assert_eq!(result.column_index("table_name"), Some(0));
        assert_eq!(result.rows[0][1], Value::Integer(1));
        assert_eq!(result.missing_columns(&["table_name", "days_to_analyze"]), vec!["days_to_analyze"]);
    }
}
