//! # Schema Store
//!
//! DDL boundary against the admin database connection. Every statement
//! target is re-validated against the strict name pattern here, regardless
//! of where the name came from.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::errors::{PreviewError, PreviewResult};
use crate::record::{Feature, Tier};
use crate::schema_name::SchemaName;
use crate::seed;

/// Connections held by the admin pool for DDL and seeding
const ADMIN_POOL_CONNECTIONS: u32 = 5;

/// Storage operations the provisioner needs
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Create the schema namespace
    async fn create_schema(&self, name: &SchemaName) -> PreviewResult<()>;

    /// Drop the schema and everything in it
    async fn drop_schema(&self, name: &SchemaName) -> PreviewResult<()>;

    /// Whether the namespace exists
    async fn schema_exists(&self, name: &SchemaName) -> PreviewResult<bool>;

    /// Run module seed routines inside the schema
    async fn run_seed(
        &self,
        name: &SchemaName,
        tier: Tier,
        features: &[Feature],
    ) -> PreviewResult<()>;
}

/// PostgreSQL-backed schema store
#[derive(Clone)]
pub struct PgSchemaStore {
    pool: PgPool,
}

impl PgSchemaStore {
    /// Build a store over a lazily-connecting admin pool
    pub fn connect_lazy(database_url: &str) -> PreviewResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(ADMIN_POOL_CONNECTIONS)
            .connect_lazy(database_url)
            .map_err(db_error)?;
        Ok(Self { pool })
    }

    /// Build a store over an existing pool
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the admin pool, draining in-flight statements
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore {
    async fn create_schema(&self, name: &SchemaName) -> PreviewResult<()> {
        ensure_ddl_safe(name)?;
        sqlx::raw_sql(&format!(
            "CREATE SCHEMA IF NOT EXISTS \"{}\"",
            name.as_str()
        ))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn drop_schema(&self, name: &SchemaName) -> PreviewResult<()> {
        ensure_ddl_safe(name)?;
        sqlx::raw_sql(&format!(
            "DROP SCHEMA IF EXISTS \"{}\" CASCADE",
            name.as_str()
        ))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn schema_exists(&self, name: &SchemaName) -> PreviewResult<bool> {
        ensure_ddl_safe(name)?;
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM pg_namespace WHERE nspname = $1) AS present",
        )
        .bind(name.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        row.try_get::<bool, _>("present").map_err(db_error)
    }

    async fn run_seed(
        &self,
        name: &SchemaName,
        tier: Tier,
        features: &[Feature],
    ) -> PreviewResult<()> {
        ensure_ddl_safe(name)?;
        seed::seed_schema(&self.pool, name, tier, features).await
    }
}

/// Last gate before SQL touches an identifier
fn ensure_ddl_safe(name: &SchemaName) -> PreviewResult<()> {
    if !SchemaName::is_ddl_safe(name.as_str()) {
        return Err(PreviewError::InvalidSchemaName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Map a driver error, classifying connection-level failures as transient
pub(crate) fn db_error(err: sqlx::Error) -> PreviewError {
    let transient = matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    );
    PreviewError::Database {
        message: err.to_string(),
        transient,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_gate_rejects_constructed_name() {
        // A SchemaName can only be built through the codec, but the gate
        // still re-checks the raw string before SQL.
        let name = SchemaName::from_token("abcdefghij1234").unwrap();
        assert!(ensure_ddl_safe(&name).is_ok());
    }

    #[test]
    fn test_transient_classification() {
        let err = db_error(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());

        let err = db_error(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
    }
}
