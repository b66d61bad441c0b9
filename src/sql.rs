//! SQL text helpers shared by the control-table store and the statement builders.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `table`, `schema.table` or `catalog.schema.table`; each part bare or double-quoted.
    static ref QUALIFIED_NAME: Regex = Regex::new(
        r#"^(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")(?:\.(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")){0,2}$"#
    )
    .expect("qualified name pattern compiles");
}

/// Check that `name` can be spliced into a statement as a table reference.
pub fn table_reference(name: &str) -> Result<&str, String> {
    if QUALIFIED_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(format!("'{}' is not a valid table name", name))
    }
}

/// Single-quoted string literal with embedded quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn timestamp_literal(at: &NaiveDateTime) -> String {
    format!("TIMESTAMP '{}'", at.format("%Y-%m-%d %H:%M:%S%.6f"))
}

/// `ARRAY['a', 'b']`
pub fn string_array_literal<S: AsRef<str>>(items: &[S]) -> String {
    let quoted = items
        .iter()
        .map(|item| quote_literal(item.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("ARRAY[{}]", quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_table_reference() {
        assert!(table_reference("orders").is_ok());
        assert!(table_reference("sales.orders").is_ok());
        assert!(table_reference("iceberg.sales.orders").is_ok());
        assert!(table_reference(r#""odd-name"."orders""#).is_ok());
        assert!(table_reference("t_4f2a9c").is_ok());

        assert!(table_reference("").is_err());
        assert!(table_reference("orders; DROP TABLE x").is_err());
        assert!(table_reference("a.b.c.d").is_err());
        assert!(table_reference("orders'").is_err());
    }

    #[test]
    fn test_literals() {
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
        assert_eq!(string_array_literal(&["a", "b"]), "ARRAY['a', 'b']");

        let at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(timestamp_literal(&at), "TIMESTAMP '2024-01-10 00:00:00.000000'");
    }
}
