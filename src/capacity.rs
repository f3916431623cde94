//! # Capacity Monitor
//!
//! Tracks active schema and connection counts against the configured
//! ceilings. Checks are snapshots, not reservations: a provision racing
//! past a momentarily stale snapshot may briefly overcommit, and the
//! orphan sweep converges the system back under the ceiling. That soft
//! behavior is deliberate; it keeps unrelated sessions free of a shared
//! reservation lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::config::PreviewConfig;
use crate::registry::SchemaRegistry;

/// Point-in-time resource usage
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    /// Schemas currently tracked (all statuses)
    pub active_schema_count: usize,
    /// Worst-case connections if every pool fills
    pub connection_estimate: u32,
    /// Configured schema ceiling
    pub max_schemas: usize,
    /// Configured per-pool connection cap
    pub max_connections_per_client: u32,
}

/// Capacity monitor over the schema registry
#[derive(Debug, Clone)]
pub struct CapacityMonitor {
    registry: SchemaRegistry,
    max_schemas: usize,
    per_schema_connection_limit: u32,
    global_connection_ceiling: u32,
    max_sessions_per_ip: u32,
    ip_sessions: Arc<RwLock<HashMap<String, u32>>>,
}

impl CapacityMonitor {
    /// Create a monitor bound to the registry
    pub fn new(config: &PreviewConfig, registry: SchemaRegistry) -> Self {
        Self {
            registry,
            max_schemas: config.max_concurrent_schemas,
            per_schema_connection_limit: config.per_schema_connection_limit,
            global_connection_ceiling: config.global_connection_ceiling,
            max_sessions_per_ip: config.max_sessions_per_ip,
            ip_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the blocking reason if a new schema cannot be provisioned.
    pub fn check_capacity(&self) -> Option<String> {
        let active = self.registry.len();

        if active >= self.max_schemas {
            return Some(format!(
                "max schemas reached ({}/{})",
                active, self.max_schemas
            ));
        }

        let projected = (active as u32 + 1) * self.per_schema_connection_limit;
        if projected > self.global_connection_ceiling {
            return Some(format!(
                "connection budget exhausted ({} projected, {} allowed)",
                projected, self.global_connection_ceiling
            ));
        }

        None
    }

    /// Returns the blocking reason if this client IP already holds its
    /// session allowance.
    pub fn check_client_ip(&self, ip: &str) -> Option<String> {
        let sessions = self.ip_sessions.read().unwrap();
        let held = sessions.get(ip).copied().unwrap_or(0);
        if held >= self.max_sessions_per_ip {
            Some(format!(
                "client holds {} of {} allowed sessions",
                held, self.max_sessions_per_ip
            ))
        } else {
            None
        }
    }

    /// Attribute a provisioned session to a client IP
    pub fn register_client_ip(&self, ip: &str) {
        let mut sessions = self.ip_sessions.write().unwrap();
        *sessions.entry(ip.to_string()).or_insert(0) += 1;
    }

    /// Release a client IP attribution when its schema is dropped
    pub fn release_client_ip(&self, ip: &str) {
        let mut sessions = self.ip_sessions.write().unwrap();
        if let Some(count) = sessions.get_mut(ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                sessions.remove(ip);
            }
        }
    }

    /// Read-only diagnostic snapshot
    pub fn resource_metrics(&self) -> ResourceSnapshot {
        let active = self.registry.len();
        ResourceSnapshot {
            active_schema_count: active,
            connection_estimate: active as u32 * self.per_schema_connection_limit,
            max_schemas: self.max_schemas,
            max_connections_per_client: self.per_schema_connection_limit,
        }
    }

    /// Warning string when usage is at or past 80% of the schema ceiling
    pub fn near_capacity_warning(&self) -> Option<String> {
        let active = self.registry.len();
        if self.max_schemas == 0 {
            return None;
        }
        let percent = (active * 100) / self.max_schemas;
        if percent >= 80 {
            Some(format!(
                "schema usage at {}% ({}/{})",
                percent, active, self.max_schemas
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SchemaRecord, Tier};
    use crate::schema_name::SchemaName;

    fn config(max_schemas: usize) -> PreviewConfig {
        PreviewConfig {
            max_concurrent_schemas: max_schemas,
            per_schema_connection_limit: 2,
            global_connection_ceiling: 100,
            max_sessions_per_ip: 2,
            ..Default::default()
        }
    }

    fn fill(registry: &SchemaRegistry, count: usize) {
        for i in 0..count {
            let token = format!("abcdefghij{:04}", i);
            let record = SchemaRecord::new(
                SchemaName::from_token(&token).unwrap(),
                Tier::Basic,
                vec![],
                None,
            );
            registry.insert(record).unwrap();
        }
    }

    #[test]
    fn test_no_reason_below_ceiling() {
        let registry = SchemaRegistry::new();
        let monitor = CapacityMonitor::new(&config(3), registry.clone());

        fill(&registry, 2);
        assert!(monitor.check_capacity().is_none());
    }

    #[test]
    fn test_blocks_at_schema_ceiling() {
        let registry = SchemaRegistry::new();
        let monitor = CapacityMonitor::new(&config(3), registry.clone());

        fill(&registry, 3);
        let reason = monitor.check_capacity().unwrap();
        assert!(reason.contains("max schemas"));
    }

    #[test]
    fn test_blocks_on_connection_budget() {
        let registry = SchemaRegistry::new();
        let config = PreviewConfig {
            max_concurrent_schemas: 50,
            per_schema_connection_limit: 10,
            global_connection_ceiling: 25,
            ..Default::default()
        };
        let monitor = CapacityMonitor::new(&config, registry.clone());

        fill(&registry, 2);
        let reason = monitor.check_capacity().unwrap();
        assert!(reason.contains("connection budget"));
    }

    #[test]
    fn test_ip_allowance() {
        let registry = SchemaRegistry::new();
        let monitor = CapacityMonitor::new(&config(10), registry);

        assert!(monitor.check_client_ip("10.0.0.1").is_none());
        monitor.register_client_ip("10.0.0.1");
        monitor.register_client_ip("10.0.0.1");
        assert!(monitor.check_client_ip("10.0.0.1").is_some());
        assert!(monitor.check_client_ip("10.0.0.2").is_none());

        monitor.release_client_ip("10.0.0.1");
        assert!(monitor.check_client_ip("10.0.0.1").is_none());
    }

    #[test]
    fn test_release_unknown_ip_is_noop() {
        let registry = SchemaRegistry::new();
        let monitor = CapacityMonitor::new(&config(10), registry);
        monitor.release_client_ip("10.9.9.9");
        assert!(monitor.check_client_ip("10.9.9.9").is_none());
    }

    #[test]
    fn test_resource_metrics() {
        let registry = SchemaRegistry::new();
        let monitor = CapacityMonitor::new(&config(10), registry.clone());

        fill(&registry, 4);
        let snapshot = monitor.resource_metrics();
        assert_eq!(snapshot.active_schema_count, 4);
        assert_eq!(snapshot.connection_estimate, 8);
        assert_eq!(snapshot.max_schemas, 10);
        assert_eq!(snapshot.max_connections_per_client, 2);
    }

    #[test]
    fn test_near_capacity_warning() {
        let registry = SchemaRegistry::new();
        let monitor = CapacityMonitor::new(&config(5), registry.clone());

        fill(&registry, 3);
        assert!(monitor.near_capacity_warning().is_none());
        fill_more(&registry, 3, 1);
        assert!(monitor.near_capacity_warning().is_some());
    }

    fn fill_more(registry: &SchemaRegistry, offset: usize, count: usize) {
        for i in offset..offset + count {
            let token = format!("abcdefghij{:04}", i);
            let record = SchemaRecord::new(
                SchemaName::from_token(&token).unwrap(),
                Tier::Basic,
                vec![],
                None,
            );
            registry.insert(record).unwrap();
        }
    }
}
