//! # Schema Registry
//!
//! In-memory table of tracked schema records, keyed by schema name.
//! Status mutation goes through the provisioner; everything else reads.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::errors::{PreviewError, PreviewResult};
use crate::record::{SchemaRecord, SchemaStatus};
use crate::schema_name::SchemaName;

/// Registry of live schema records
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    records: Arc<RwLock<HashMap<SchemaName, SchemaRecord>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. Fails if the name is already tracked.
    pub fn insert(&self, record: SchemaRecord) -> PreviewResult<()> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(&record.schema_name) {
            return Err(PreviewError::Provisioning {
                schema: record.schema_name.to_string(),
                reason: "schema is already tracked".to_string(),
            });
        }
        records.insert(record.schema_name.clone(), record);
        Ok(())
    }

    /// Get a snapshot of one record
    pub fn get(&self, name: &SchemaName) -> Option<SchemaRecord> {
        self.records.read().unwrap().get(name).cloned()
    }

    /// Get a snapshot of one record only if it is serving traffic
    pub fn get_ready(&self, name: &SchemaName) -> Option<SchemaRecord> {
        self.records
            .read()
            .unwrap()
            .get(name)
            .filter(|r| r.is_ready())
            .cloned()
    }

    /// Transition `Provisioning -> Ready`. A record in `Dropping` never
    /// comes back.
    pub fn mark_ready(&self, name: &SchemaName) -> PreviewResult<()> {
        let mut records = self.records.write().unwrap();
        let record = records.get_mut(name).ok_or_else(|| PreviewError::TenantNotFound {
            schema: name.to_string(),
        })?;
        if record.status == SchemaStatus::Dropping {
            return Err(PreviewError::Provisioning {
                schema: name.to_string(),
                reason: "schema is being dropped".to_string(),
            });
        }
        record.status = SchemaStatus::Ready;
        Ok(())
    }

    /// Transition into `Dropping`. Idempotent for untracked names.
    pub fn mark_dropping(&self, name: &SchemaName) {
        let mut records = self.records.write().unwrap();
        if let Some(record) = records.get_mut(name) {
            record.status = SchemaStatus::Dropping;
        }
    }

    /// Remove a record, returning it for final accounting
    pub fn remove(&self, name: &SchemaName) -> Option<SchemaRecord> {
        self.records.write().unwrap().remove(name)
    }

    /// Refresh `last_used_at` on request traffic
    pub fn touch(&self, name: &SchemaName) {
        let mut records = self.records.write().unwrap();
        if let Some(record) = records.get_mut(name) {
            record.last_used_at = Utc::now();
        }
    }

    /// Snapshot of every tracked record
    pub fn list(&self) -> Vec<SchemaRecord> {
        self.records.read().unwrap().values().cloned().collect()
    }

    /// Number of tracked schemas (all statuses)
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Whether any schema is tracked
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Tier;

    fn name(token: &str) -> SchemaName {
        SchemaName::from_token(token).unwrap()
    }

    fn record(token: &str) -> SchemaRecord {
        SchemaRecord::new(name(token), Tier::Basic, vec![], None)
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = SchemaRegistry::new();
        registry.insert(record("abcdefghij0001")).unwrap();

        let n = name("abcdefghij0001");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&n).unwrap().status, SchemaStatus::Provisioning);

        let removed = registry.remove(&n).unwrap();
        assert_eq!(removed.schema_name, n);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let registry = SchemaRegistry::new();
        registry.insert(record("abcdefghij0001")).unwrap();
        assert!(registry.insert(record("abcdefghij0001")).is_err());
    }

    #[test]
    fn test_ready_transition() {
        let registry = SchemaRegistry::new();
        let n = name("abcdefghij0001");
        registry.insert(record("abcdefghij0001")).unwrap();

        assert!(registry.get_ready(&n).is_none());
        registry.mark_ready(&n).unwrap();
        assert!(registry.get_ready(&n).is_some());
    }

    #[test]
    fn test_dropping_is_terminal() {
        let registry = SchemaRegistry::new();
        let n = name("abcdefghij0001");
        registry.insert(record("abcdefghij0001")).unwrap();
        registry.mark_ready(&n).unwrap();

        registry.mark_dropping(&n);
        assert!(registry.get_ready(&n).is_none());
        assert!(registry.mark_ready(&n).is_err());
        assert_eq!(registry.get(&n).unwrap().status, SchemaStatus::Dropping);
    }

    #[test]
    fn test_mark_dropping_untracked_is_noop() {
        let registry = SchemaRegistry::new();
        registry.mark_dropping(&name("abcdefghij0001"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_touch_updates_last_used() {
        let registry = SchemaRegistry::new();
        let n = name("abcdefghij0001");
        registry.insert(record("abcdefghij0001")).unwrap();

        let before = registry.get(&n).unwrap().last_used_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.touch(&n);
        let after = registry.get(&n).unwrap().last_used_at;
        assert!(after > before);
    }
}
