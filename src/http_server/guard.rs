//! # Internal API Guard
//!
//! Verifies HMAC-signed, timestamp-bound requests from the studio control
//! plane. Provision, drop, and invalidate operations are always gated;
//! there is no configuration that turns this off.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::{ErrorResponse, PreviewError, PreviewResult};

use super::AppState;

/// Signed request header carrying the hex digest
pub const SIGNATURE_HEADER: &str = "x-internal-signature";

/// Signed request header carrying the unix-seconds timestamp
pub const TIMESTAMP_HEADER: &str = "x-internal-timestamp";

/// Bodies past this size are rejected before signature verification
const MAX_SIGNED_BODY_BYTES: usize = 64 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// HMAC verifier for control-plane requests
#[derive(Clone)]
pub struct InternalApiGuard {
    secret: Vec<u8>,
    replay_window: Duration,
}

impl InternalApiGuard {
    /// Create a guard over the shared secret
    pub fn new(secret: &str, replay_window: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            replay_window,
        }
    }

    /// Compute the hex signature for a request. The signed string is
    /// `"{timestamp}.{METHOD}.{path}.{body}"`; query strings are not part
    /// of the signature.
    pub fn sign(&self, timestamp: i64, method: &str, path: &str, body: &[u8]) -> String {
        hex::encode(self.digest(timestamp, method, path, body))
    }

    fn digest(&self, timestamp: i64, method: &str, path: &str, body: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length; new_from_slice cannot fail
        let mut mac = HmacSha256::new_from_slice(&self.secret).unwrap();
        mac.update(format!("{}.{}.{}.", timestamp, method.to_uppercase(), path).as_bytes());
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }

    /// Verify headers against the current clock
    pub fn verify(
        &self,
        method: &str,
        path: &str,
        timestamp_header: &str,
        signature_header: &str,
        body: &[u8],
    ) -> PreviewResult<()> {
        self.verify_at(
            Utc::now().timestamp(),
            method,
            path,
            timestamp_header,
            signature_header,
            body,
        )
    }

    /// Clock-injected verification core
    pub fn verify_at(
        &self,
        now: i64,
        method: &str,
        path: &str,
        timestamp_header: &str,
        signature_header: &str,
        body: &[u8],
    ) -> PreviewResult<()> {
        let timestamp: i64 = timestamp_header.parse().map_err(|_| PreviewError::Auth {
            reason: "malformed timestamp".to_string(),
        })?;

        if (now - timestamp).unsigned_abs() > self.replay_window.as_secs() {
            return Err(PreviewError::Auth {
                reason: "timestamp outside replay window".to_string(),
            });
        }

        let provided = hex::decode(signature_header).map_err(|_| PreviewError::Auth {
            reason: "malformed signature".to_string(),
        })?;
        let expected = self.digest(timestamp, method, path, body);

        // Slice ct_eq is length-aware and constant-time over the contents
        if expected.ct_eq(provided.as_slice()).into() {
            Ok(())
        } else {
            Err(PreviewError::Auth {
                reason: "signature mismatch".to_string(),
            })
        }
    }
}

/// Middleware gating destructive and provisioning endpoints
pub async fn require_internal_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, MAX_SIGNED_BODY_BYTES)
        .await
        .map_err(|_| reject("request body too large or unreadable"))?;

    let timestamp = parts
        .headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| reject("missing timestamp header"))?;
    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| reject("missing signature header"))?;

    state
        .guard
        .verify(
            parts.method.as_str(),
            parts.uri.path(),
            timestamp,
            signature,
            &bytes,
        )
        .map_err(|err| {
            tracing::warn!(
                path = parts.uri.path(),
                error = %err,
                "rejected internal request"
            );
            let response = ErrorResponse::from(&err);
            (StatusCode::UNAUTHORIZED, Json(response))
        })?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn reject(reason: &str) -> (StatusCode, Json<ErrorResponse>) {
    let err = PreviewError::Auth {
        reason: reason.to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::from(&err)))
}
