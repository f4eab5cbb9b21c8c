//! Proxy forwarder
//!
//! Validates the requested sub-resource, forwards the client's body to the
//! metadata API with the current bearer token, and retries exactly once when
//! the upstream rejects the token with a 401.

use std::sync::Arc;

use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{CredentialsConfig, UpstreamConfig};
use crate::oauth::TokenManager;
use crate::{Error, Result};

/// Sub-resources the proxy is permitted to forward to. Anything else is
/// rejected before any network call.
pub const ALLOWED_ENDPOINTS: &[&str] = &[
    "games",
    "covers",
    "screenshots",
    "artworks",
    "genres",
    "platforms",
    "involved_companies",
    "companies",
    "game_modes",
    "themes",
    "player_perspectives",
    "franchises",
    "collections",
    "search",
    "release_dates",
    "websites",
    "game_videos",
];

/// Whether `endpoint` is a forwardable sub-resource
#[must_use]
pub fn is_allowed_endpoint(endpoint: &str) -> bool {
    ALLOWED_ENDPOINTS.contains(&endpoint)
}

/// Outcome of a single upstream attempt
enum Outcome {
    /// Upstream accepted; JSON body to relay verbatim
    Relayed(Value),
    /// Upstream rejected the bearer token
    AuthRejected { status: u16, body: String },
    /// Upstream rejected the request for any other reason
    Rejected { status: u16, body: String },
}

/// Forwards validated requests to the metadata API
pub struct Forwarder {
    http: Client,
    api_base_url: String,
    client_id: Option<String>,
    tokens: Arc<TokenManager>,
}

impl Forwarder {
    /// Create a forwarder for the configured metadata API
    #[must_use]
    pub fn new(
        http: Client,
        upstream: &UpstreamConfig,
        credentials: &CredentialsConfig,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http,
            api_base_url: upstream.api_base_url.trim_end_matches('/').to_string(),
            client_id: credentials.client_id.clone(),
            tokens,
        }
    }

    /// Forward `body` to the given sub-resource and return the upstream JSON.
    ///
    /// Validation failures return before any network call. A 401 from the
    /// upstream invalidates the cached token and retries once with a fresh
    /// one; the most recently attempted failure is what gets surfaced.
    pub async fn forward(&self, endpoint: &str, body: &str) -> Result<Value> {
        if !is_allowed_endpoint(endpoint) {
            return Err(Error::InvalidRequest(format!(
                "Invalid endpoint: \"{endpoint}\""
            )));
        }

        if body.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "Request body is required".to_string(),
            ));
        }

        let mut retried = false;
        loop {
            let token = self.tokens.get_token().await?;

            match self.send(endpoint, body, &token).await? {
                Outcome::Relayed(value) => return Ok(value),
                Outcome::AuthRejected { .. } if !retried => {
                    debug!(endpoint, "Upstream rejected token, retrying with a fresh one");
                    self.tokens.invalidate().await;
                    retried = true;
                }
                Outcome::AuthRejected { status, body } | Outcome::Rejected { status, body } => {
                    warn!(endpoint, status, retried, "Upstream rejected request");
                    return Err(Error::Upstream { status, body });
                }
            }
        }
    }

    /// Issue one upstream POST with the given bearer token
    async fn send(&self, endpoint: &str, body: &str, token: &str) -> Result<Outcome> {
        let url = format!("{}/{endpoint}", self.api_base_url);

        let mut request = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "text/plain")
            .body(body.to_string());

        if let Some(ref client_id) = self.client_id {
            request = request.header("Client-ID", client_id.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Ok(Outcome::AuthRejected {
                status: status.as_u16(),
                body,
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Ok(Outcome::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let value = response.json().await?;
        Ok(Outcome::Relayed(value))
    }
}
