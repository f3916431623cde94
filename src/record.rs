//! # Schema Record Model
//!
//! Core types for tracked preview schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema_name::SchemaName;

/// Preview tier granted to the prospect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Core modules only
    Basic,
    /// Production-equivalent feature set
    Pro,
    /// Everything enabled
    Enterprise,
}

impl Default for Tier {
    fn default() -> Self {
        Self::Basic
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Pro => write!(f, "pro"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// Business modules that can be seeded into a preview schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Ecommerce,
    Lms,
    Helpdesk,
    Invoicing,
    Booking,
    Events,
}

impl Feature {
    /// All modules, in seed order
    pub fn all() -> &'static [Feature] {
        &[
            Feature::Ecommerce,
            Feature::Lms,
            Feature::Helpdesk,
            Feature::Invoicing,
            Feature::Booking,
            Feature::Events,
        ]
    }

    /// Identifier recorded in `preview_meta`
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Ecommerce => "ecommerce",
            Feature::Lms => "lms",
            Feature::Helpdesk => "helpdesk",
            Feature::Invoicing => "invoicing",
            Feature::Booking => "booking",
            Feature::Events => "events",
        }
    }
}

/// Schema lifecycle status
///
/// `Dropping` is terminal: a record never transitions back out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaStatus {
    /// DDL and seeding in flight
    Provisioning,
    /// Serving tenant traffic
    Ready,
    /// Teardown in flight
    Dropping,
}

/// Tracked state for one provisioned schema
#[derive(Debug, Clone, Serialize)]
pub struct SchemaRecord {
    /// Derived schema identifier
    pub schema_name: SchemaName,
    /// Lifecycle status
    pub status: SchemaStatus,
    /// Preview tier
    pub tier: Tier,
    /// Seeded modules
    pub features: Vec<Feature>,
    /// Requesting client IP, when the control plane forwarded one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last time a request resolved to this schema
    pub last_used_at: DateTime<Utc>,
}

impl SchemaRecord {
    /// Create a record in the `Provisioning` state
    pub fn new(
        schema_name: SchemaName,
        tier: Tier,
        features: Vec<Feature>,
        client_ip: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            schema_name,
            status: SchemaStatus::Provisioning,
            tier,
            features,
            client_ip,
            created_at: now,
            last_used_at: now,
        }
    }

    /// Check if the schema is serving traffic
    pub fn is_ready(&self) -> bool {
        self.status == SchemaStatus::Ready
    }

    /// Age since provisioning started
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}
