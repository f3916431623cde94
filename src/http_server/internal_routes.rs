//! # Internal Control-Plane Routes
//!
//! Endpoints the studio backend calls to manage preview schemas. The
//! destructive ones sit behind the signature guard; health and metrics
//! are open reads inside the trust boundary.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::capacity::ResourceSnapshot;
use crate::provisioner::SchemaProvisioner;
use crate::record::{Feature, Tier};
use crate::schema_name::SchemaName;

use super::{error_response, AppState};

/// Provision request from the control plane
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    pub session_token: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub client_ip: Option<String>,
}

/// Provision response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    pub schema_name: SchemaName,
    pub status: &'static str,
}

/// Provision a schema for a new preview session
pub async fn provision_schema(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProvisionRequest>,
) -> impl IntoResponse {
    // An empty selection means the prospect gets the full tour
    let features = if request.features.is_empty() {
        Feature::all().to_vec()
    } else {
        request.features
    };

    match state
        .provisioner
        .provision(
            &request.session_token,
            features,
            request.tier,
            request.client_ip,
        )
        .await
    {
        Ok(schema_name) => (
            StatusCode::CREATED,
            Json(ProvisionResponse {
                schema_name,
                status: "READY",
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// Drop a schema by name
pub async fn drop_schema(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let schema = match SchemaName::parse(&name) {
        Ok(schema) => schema,
        Err(err) => return error_response(&err),
    };

    match SchemaProvisioner::drop(&state.provisioner, &schema).await {
        Ok(()) => Json(serde_json::json!({ "message": "Schema dropped" })).into_response(),
        Err(err) => error_response(&err),
    }
}

/// Session invalidation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    pub session_token: String,
}

/// Best-effort cache invalidation: close the pooled client so the next
/// request reopens a fresh one. The schema itself is untouched.
pub async fn invalidate_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvalidateRequest>,
) -> impl IntoResponse {
    if let Ok(name) = SchemaName::from_token(&request.session_token) {
        state.pool.remove(&name).await;
    }
    Json(serde_json::json!({ "success": true }))
}

/// Capacity response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityResponse {
    pub can_provision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Whether a new schema could be provisioned right now
pub async fn get_capacity(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reason = state.capacity.check_capacity();
    Json(CapacityResponse {
        can_provision: reason.is_none(),
        reason,
    })
}

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Metrics response
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub snapshot: ResourceSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Resource snapshot, with a warning when close to the ceiling
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(MetricsResponse {
        snapshot: state.capacity.resource_metrics(),
        warning: state.capacity.near_capacity_warning(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_server::test_support::{signed_request, test_state};
    use crate::http_server::{guard, router};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_provision_route() {
        let (state, store) = test_state();
        let app = router(state.clone());

        let request = signed_request(
            &state,
            "POST",
            "/internal/schemas/provision",
            r#"{"sessionToken":"abcdefghij1234","features":["lms"],"tier":"basic"}"#,
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["schemaName"], "preview_abcdefghij1234");
        assert_eq!(body["status"], "READY");
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provision_requires_signature() {
        let (state, store) = test_state();
        let app = router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/internal/schemas/provision")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"sessionToken":"abcdefghij1234"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provision_rejects_tampered_signature() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        let mut request = signed_request(
            &state,
            "POST",
            "/internal/schemas/provision",
            r#"{"sessionToken":"abcdefghij1234"}"#,
        );
        request.headers_mut().insert(
            guard::SIGNATURE_HEADER,
            "00".repeat(32).parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_provision_invalid_token_is_400() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        let request = signed_request(
            &state,
            "POST",
            "/internal/schemas/provision",
            r#"{"sessionToken":"x!"}"#,
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_drop_route_idempotent() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        let request = signed_request(
            &state,
            "DELETE",
            "/internal/schemas/preview_abcdefghij1234",
            "",
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Schema dropped");
    }

    #[tokio::test]
    async fn test_drop_route_rejects_bad_name() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        let request = signed_request(
            &state,
            "DELETE",
            "/internal/schemas/public",
            "",
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_SCHEMA_NAME");
    }

    #[tokio::test]
    async fn test_invalidate_session_route() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        // Provision, then resolve once so a client is pooled
        let request = signed_request(
            &state,
            "POST",
            "/internal/schemas/provision",
            r#"{"sessionToken":"abcdefghij1234"}"#,
        );
        app.clone().oneshot(request).await.unwrap();
        let name = SchemaName::from_token("abcdefghij1234").unwrap();
        let record = state.registry.get(&name).unwrap();
        state.pool.get_or_create(&record);
        assert!(state.pool.contains(&name));

        let request = signed_request(
            &state,
            "POST",
            "/internal/sessions/invalidate",
            r#"{"sessionToken":"abcdefghij1234"}"#,
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);

        // Client gone, record intact
        assert!(!state.pool.contains(&name));
        assert!(state.registry.get_ready(&name).is_some());
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let (state, _store) = test_state();
        let app = router(state);

        let request = Request::builder()
            .method("GET")
            .uri("/internal/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_metrics_reports_snapshot() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        let request = signed_request(
            &state,
            "POST",
            "/internal/schemas/provision",
            r#"{"sessionToken":"abcdefghij1234"}"#,
        );
        app.clone().oneshot(request).await.unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/internal/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["activeSchemaCount"], 1);
        assert_eq!(body["maxSchemas"], 50);
    }

    #[tokio::test]
    async fn test_capacity_route() {
        let (state, _store) = test_state();
        let app = router(state.clone());

        let request = signed_request(&state, "GET", "/internal/capacity", "");
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["canProvision"], true);
        assert!(body.get("reason").is_none());
    }
}
