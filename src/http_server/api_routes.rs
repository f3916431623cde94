//! # Session-Scoped Routes
//!
//! Routes that run behind the tenant resolver and consume the scoped
//! database handle from request extensions. Business modules follow the
//! same pattern with their own routers.

use std::time::Duration;

use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Serialize;

use crate::pool::TenantDb;
use crate::record::{Feature, Tier};
use crate::schema_name::SchemaName;

/// Budget for the status probe; a slow database reads as unreachable
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Status of the caller's preview session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewStatus {
    pub schema_name: SchemaName,
    pub tier: Tier,
    pub features: Vec<Feature>,
    pub database: &'static str,
}

/// Report the session's schema, tier, modules, and a live probe through
/// the scoped pool.
pub async fn preview_status(Extension(db): Extension<TenantDb>) -> impl IntoResponse {
    let database = match tokio::time::timeout(PROBE_TIMEOUT, db.health_check()).await {
        Ok(Ok(())) => "ok",
        _ => "unreachable",
    };

    Json(PreviewStatus {
        schema_name: db.schema().clone(),
        tier: db.tier(),
        features: db.features().to_vec(),
        database,
    })
}
