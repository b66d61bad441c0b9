//! One statement template per operation kind.

use crate::core::DueOperation;
use crate::sql::{string_array_literal, table_reference};

/// Render the statement that performs `operation` on `table_name`.
///
/// Fails only when `table_name` is not a usable table reference.
pub fn render(table_name: &str, operation: &DueOperation) -> Result<String, String> {
    let table = table_reference(table_name)?;

    let statement = match operation {
        DueOperation::Analyze { columns } if columns.is_empty() => format!("ANALYZE {}", table),
        DueOperation::Analyze { columns } => format!(
            "ANALYZE {} WITH (columns = {})",
            table,
            string_array_literal(columns)
        ),
        DueOperation::Optimize => format!("ALTER TABLE {} EXECUTE optimize", table),
        DueOperation::ExpireSnapshots { retention_days } => format!(
            "ALTER TABLE {} EXECUTE expire_snapshots(retention_threshold => '{}d')",
            table, retention_days
        ),
        DueOperation::RemoveOrphanFiles { retention_days } => format!(
            "ALTER TABLE {} EXECUTE remove_orphan_files(retention_threshold => '{}d')",
            table, retention_days
        ),
    };

    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        assert_eq!(
            render("orders", &DueOperation::Analyze { columns: vec![] }).unwrap(),
            "ANALYZE orders"
        );
        assert_eq!(
            render(
                "sales.orders",
                &DueOperation::Analyze {
                    columns: vec!["a".into(), "it's".into()]
                }
            )
            .unwrap(),
            "ANALYZE sales.orders WITH (columns = ARRAY['a', 'it''s'])"
        );
        assert_eq!(
            render("orders", &DueOperation::Optimize).unwrap(),
            "ALTER TABLE orders EXECUTE optimize"
        );
        assert_eq!(
            render("orders", &DueOperation::ExpireSnapshots { retention_days: 30 }).unwrap(),
            "ALTER TABLE orders EXECUTE expire_snapshots(retention_threshold => '30d')"
        );
        assert_eq!(
            render("orders", &DueOperation::RemoveOrphanFiles { retention_days: 7 }).unwrap(),
            "ALTER TABLE orders EXECUTE remove_orphan_files(retention_threshold => '7d')"
        );
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        assert!(render("orders; DROP TABLE users", &DueOperation::Optimize).is_err());
    }
}
