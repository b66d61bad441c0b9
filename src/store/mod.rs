//! Access to the control table holding one [`MaintenancePolicy`] per managed table.

pub mod memory;
pub mod sql;

use crate::core::{MaintenancePolicy, ScheduleField, StoreResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt;

pub use memory::MemoryScheduleStore;
pub use sql::SqlScheduleStore;

/// A control-table row that could not be read as a policy. It only affects
/// the table it names; the other rows are still maintained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRow {
    /// The row's `table_name`, or `row N` when that cell is unusable.
    pub key: String,
    pub reason: String,
}

impl fmt::Display for InvalidRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}

pub type PolicyRow = Result<MaintenancePolicy, InvalidRow>;

/// Repository over the control table: load every policy, update one timestamp.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Read all rows in table order. Fails with [`StoreError::Unavailable`](crate::core::StoreError::Unavailable)
    /// when the table cannot be read and [`StoreError::Schema`](crate::core::StoreError::Schema)
    /// when a required column is missing. A row holding an unreadable value
    /// comes back as an [`InvalidRow`].
    async fn load_policies(&self) -> StoreResult<Vec<PolicyRow>>;

    /// Set `field` of the policy for `table_name` to `at`, leaving every other column untouched.
    async fn update_last_run(
        &self,
        table_name: &str,
        field: ScheduleField,
        at: NaiveDateTime,
    ) -> StoreResult<()>;
}
