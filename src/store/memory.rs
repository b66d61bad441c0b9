use super::{PolicyRow, ScheduleStore};
use crate::core::{MaintenancePolicy, ScheduleField, StoreResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Mutex;

/// Control table kept in process memory. Policies load in insertion order.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    policies: Mutex<Vec<MaintenancePolicy>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policies(policies: impl IntoIterator<Item = MaintenancePolicy>) -> Self {
        let store = Self::new();
        for policy in policies {
            store.upsert(policy);
        }
        store
    }

    /// Insert a policy, replacing any existing row for the same table.
    pub fn upsert(&self, policy: MaintenancePolicy) {
        let mut policies = self.policies.lock().unwrap_or_else(|e| e.into_inner());
        match policies.iter_mut().find(|p| p.table_name == policy.table_name) {
            Some(existing) => *existing = policy,
            None => policies.push(policy),
        }
    }

    pub fn get(&self, table_name: &str) -> Option<MaintenancePolicy> {
        self.policies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.table_name == table_name)
            .cloned()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn load_policies(&self) -> StoreResult<Vec<PolicyRow>> {
        Ok(self.policies.lock()?.iter().cloned().map(Ok).collect())
    }

    async fn update_last_run(
        &self,
        table_name: &str,
        field: ScheduleField,
        at: NaiveDateTime,
    ) -> StoreResult<()> {
        let mut policies = self.policies.lock()?;
        // like an UPDATE matching no row, an unknown table is a no-op
        if let Some(policy) = policies.iter_mut().find(|p| p.table_name == table_name) {
            policy.set_last_run(field, at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_update_only_touches_named_row_and_field() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let store = MemoryScheduleStore::with_policies([
            MaintenancePolicy::new("orders").analyze_every(7),
            MaintenancePolicy::new("events").optimize_every(1),
        ]);

        store
            .update_last_run("orders", ScheduleField::LastAnalyzedOn, at)
            .await
            .unwrap();
        store
            .update_last_run("missing", ScheduleField::LastAnalyzedOn, at)
            .await
            .unwrap();

        let policies = store.load_policies().await.unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(
            policies[0],
            Ok(MaintenancePolicy::new("orders").analyze_every(7).last_analyzed_on(at))
        );
        assert_eq!(policies[1], Ok(MaintenancePolicy::new("events").optimize_every(1)));
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let store = MemoryScheduleStore::with_policies([MaintenancePolicy::new("orders")]);
        store.upsert(MaintenancePolicy::new("orders").expire_snapshots(3));

        assert_eq!(store.get("orders").unwrap().retention_days_snapshots, Some(3));
    }
}
