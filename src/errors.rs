//! # Preview Core Errors
//!
//! Error taxonomy for schema provisioning and tenant resolution.

use serde::Serialize;
use thiserror::Error;

/// Result type for preview core operations
pub type PreviewResult<T> = Result<T, PreviewError>;

/// Preview core errors
#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    /// Session token does not sanitize to a usable schema name
    #[error("Invalid session token: {reason}")]
    InvalidToken { reason: String },

    /// Schema name failed the strict pre-DDL pattern
    #[error("Invalid schema name: {name}")]
    InvalidSchemaName { name: String },

    /// Global ceilings would be exceeded; caller should retry later
    #[error("Capacity exceeded: {reason}")]
    CapacityExceeded { reason: String },

    /// Schema creation or seeding failed after retries
    #[error("Provisioning failed for {schema}: {reason}")]
    Provisioning { schema: String, reason: String },

    /// Schema drop failed after retries
    #[error("Drop failed for {schema}: {reason}")]
    Drop { schema: String, reason: String },

    /// No provisioned schema record for the resolved name
    #[error("No active preview session for schema: {schema}")]
    TenantNotFound { schema: String },

    /// Internal API signature missing, malformed, or stale
    #[error("Unauthorized internal request: {reason}")]
    Auth { reason: String },

    /// Database operation failure
    #[error("Database error: {message}")]
    Database { message: String, transient: bool },

    /// Studio control-plane call failure
    #[error("Studio API error: {message}")]
    Studio { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PreviewError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken { .. } => 400,
            Self::InvalidSchemaName { .. } => 400,
            Self::CapacityExceeded { .. } => 429,
            Self::Provisioning { .. } => 500,
            Self::Drop { .. } => 500,
            Self::TenantNotFound { .. } => 404,
            Self::Auth { .. } => 401,
            Self::Database { .. } => 500,
            Self::Studio { .. } => 502,
            Self::Config { .. } => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken { .. } => "INVALID_TOKEN",
            Self::InvalidSchemaName { .. } => "INVALID_SCHEMA_NAME",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::Provisioning { .. } => "PROVISIONING_FAILED",
            Self::Drop { .. } => "DROP_FAILED",
            Self::TenantNotFound { .. } => "TENANT_NOT_FOUND",
            Self::Auth { .. } => "UNAUTHORIZED",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Studio { .. } => "STUDIO_UNAVAILABLE",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// Whether a bounded retry is worthwhile (connection-level failures only)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database { transient: true, .. })
    }

    /// Message safe to return to callers. Internal failure detail stays in
    /// the log; the wire gets a generic classification.
    pub fn public_message(&self) -> String {
        match self {
            Self::Provisioning { schema, .. } => {
                format!("Provisioning failed for {}", schema)
            }
            Self::Drop { schema, .. } => format!("Drop failed for {}", schema),
            Self::Database { .. } => "Database operation failed".to_string(),
            Self::Studio { .. } => "Upstream service unavailable".to_string(),
            Self::Config { .. } => "Service misconfigured".to_string(),
            other => other.to_string(),
        }
    }
}

/// API error body: `{"error": {"message", "code"}}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Inner error payload
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
}

impl From<&PreviewError> for ErrorResponse {
    fn from(err: &PreviewError) -> Self {
        Self {
            error: ErrorBody {
                message: err.public_message(),
                code: err.error_code(),
            },
        }
    }
}
