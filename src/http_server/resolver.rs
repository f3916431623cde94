//! # Tenant Resolver
//!
//! Request-scoped middleware mapping the inbound session token to its
//! schema and attaching a scoped database handle for the rest of the
//! request. Read-only against the registry; never performs DDL.
//!
//! The registry lookup, not the name pattern, is what keeps stale or
//! forged tokens away from arbitrary schemas: a syntactically valid name
//! that was never provisioned resolves to nothing.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;

use crate::errors::{ErrorResponse, PreviewError};
use crate::schema_name::SchemaName;

use super::AppState;

/// Header carrying the preview session token
pub const SESSION_HEADER: &str = "x-preview-session";

/// Cookie fallback used by the browser-facing preview frontend
pub const SESSION_COOKIE: &str = "preview_session";

/// Middleware that must run before any business-module route
pub async fn resolve_tenant(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_session_token(request.headers()).ok_or_else(|| {
        not_found("<missing>")
    })?;

    let name = match SchemaName::from_token(&token) {
        Ok(name) => name,
        Err(err) => {
            // Malformed tokens are indistinguishable from unknown ones to
            // the caller; the distinction only matters in the log.
            tracing::debug!(error = %err, "session token failed to resolve");
            return Err(not_found("<invalid>"));
        }
    };

    let record = state
        .registry
        .get_ready(&name)
        .ok_or_else(|| not_found(name.as_str()))?;

    state.registry.touch(&name);
    let db = state.pool.get_or_create(&record);
    request.extensions_mut().insert(db);

    Ok(next.run(request).await)
}

/// Pull the session token from the header or the cookie fallback
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

fn not_found(schema: &str) -> (StatusCode, Json<ErrorResponse>) {
    let err = PreviewError::TenantNotFound {
        schema: schema.to_string(),
    };
    (StatusCode::NOT_FOUND, Json(ErrorResponse::from(&err)))
}
