//! # Studio Client
//!
//! Read-only client for the studio control plane, which owns session
//! state. The sweeper uses it to learn which sessions are still live.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{PreviewError, PreviewResult};

/// Request budget for the active-session listing
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Source of truth for which preview sessions are still live
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Tokens of every session the control plane considers active
    async fn live_session_tokens(&self) -> PreviewResult<HashSet<String>>;
}

/// HTTP client against the studio internal API
pub struct StudioClient {
    http: reqwest::Client,
    base_url: String,
}

impl StudioClient {
    /// Build a client for the studio base URL
    pub fn new(base_url: &str) -> PreviewResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PreviewError::Studio {
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveSession {
    session_token: String,
}

#[derive(Debug, Deserialize)]
struct ActiveSessionsResponse {
    sessions: Vec<ActiveSession>,
}

#[async_trait]
impl SessionAuthority for StudioClient {
    async fn live_session_tokens(&self) -> PreviewResult<HashSet<String>> {
        let url = format!("{}/api/internal/sessions/active", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(studio_error)?
            .error_for_status()
            .map_err(studio_error)?;

        let body: ActiveSessionsResponse = response.json().await.map_err(studio_error)?;
        Ok(body
            .sessions
            .into_iter()
            .map(|s| s.session_token)
            .collect())
    }
}

fn studio_error(err: reqwest::Error) -> PreviewError {
    PreviewError::Studio {
        message: err.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = StudioClient::new("http://studio.internal:4000/").unwrap();
        assert_eq!(client.base_url, "http://studio.internal:4000");
    }

    #[test]
    fn test_session_wire_shape() {
        let body: ActiveSessionsResponse = serde_json::from_str(
            r#"{"sessions":[{"sessionToken":"abc-def-123"},{"sessionToken":"xyz"}]}"#,
        )
        .unwrap();
        assert_eq!(body.sessions.len(), 2);
        assert_eq!(body.sessions[0].session_token, "abc-def-123");
    }
}
