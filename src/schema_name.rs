//! # Schema Name Codec
//!
//! Derives the per-session PostgreSQL schema identifier from an opaque
//! session token. Pure and deterministic; the strict pattern check is the
//! last gate before any DDL touches a name.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::{PreviewError, PreviewResult};

/// Fixed prefix for every preview schema
pub const SCHEMA_PREFIX: &str = "preview_";

/// Minimum sanitized token length
const MIN_TOKEN_CHARS: usize = 10;

/// Maximum sanitized token length (keeps the identifier within the
/// 63-byte PostgreSQL limit)
const MAX_TOKEN_CHARS: usize = 55;

/// Strict pattern applied immediately before DDL execution
fn ddl_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^preview_[a-z0-9]{10,55}$").unwrap())
}

/// A validated preview schema identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SchemaName(String);

impl SchemaName {
    /// Derive a schema name from a session token.
    ///
    /// Lowercases, strips everything outside `[a-z0-9]`, and truncates the
    /// remainder to fit the identifier limit. Tokens that sanitize to fewer
    /// than 10 characters are rejected; padding is never applied.
    pub fn from_token(token: &str) -> PreviewResult<Self> {
        let sanitized: String = token
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();

        if sanitized.len() < MIN_TOKEN_CHARS {
            return Err(PreviewError::InvalidToken {
                reason: format!(
                    "token must contain at least {} alphanumeric characters",
                    MIN_TOKEN_CHARS
                ),
            });
        }

        let truncated = &sanitized[..sanitized.len().min(MAX_TOKEN_CHARS)];
        Ok(Self(format!("{}{}", SCHEMA_PREFIX, truncated)))
    }

    /// Wrap an already-derived name, rejecting anything outside the strict
    /// pattern. Used at the drop endpoint where the caller supplies a name.
    pub fn parse(name: &str) -> PreviewResult<Self> {
        if !Self::is_ddl_safe(name) {
            return Err(PreviewError::InvalidSchemaName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// General bookkeeping check: prefix, charset, and length bounds.
    pub fn is_valid(name: &str) -> bool {
        let Some(rest) = name.strip_prefix(SCHEMA_PREFIX) else {
            return false;
        };
        rest.len() >= MIN_TOKEN_CHARS
            && name.len() <= 63
            && rest.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    }

    /// Strict pre-execution check. Defense in depth: every DDL statement
    /// re-validates its target against this pattern even when the name came
    /// from `from_token`.
    pub fn is_ddl_safe(name: &str) -> bool {
        ddl_pattern().is_match(name)
    }

    /// Borrow the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
