//! OAuth token management
//!
//! Acquires an access token from the identity provider via the OAuth2
//! client-credentials grant and memoizes it in process memory. The cached
//! credential is considered stale 60 seconds before its reported expiry so a
//! token never lapses mid-flight. A process restart starts cold.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{CredentialsConfig, UpstreamConfig};
use crate::{Error, Result};

/// Safety margin subtracted from the reported expiry (seconds)
const EXPIRY_SAFETY_MARGIN: u64 = 60;

/// OAuth token response from the identity provider
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// A memoized access token with its expiry
#[derive(Debug, Clone)]
struct CachedCredential {
    access_token: String,
    /// Expiration time (Unix timestamp); `None` never expires
    expires_at: Option<u64>,
}

impl CachedCredential {
    fn from_response(access_token: String, expires_in: Option<u64>) -> Self {
        let expires_at = expires_in.map(|secs| unix_now() + secs);
        Self {
            access_token,
            expires_at,
        }
    }

    /// Whether the credential is outside its validity window, applying the
    /// safety margin.
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => unix_now() + EXPIRY_SAFETY_MARGIN >= expires_at,
            None => false,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Token manager: memoized client-credentials exchange.
///
/// Owned by the server and injected into the forwarder, so the credential
/// lifecycle is explicit rather than hidden in module-level state.
pub struct TokenManager {
    http: Client,
    token_url: String,
    credentials: CredentialsConfig,
    cached: Mutex<Option<CachedCredential>>,
}

impl TokenManager {
    /// Create a token manager for the configured identity provider
    #[must_use]
    pub fn new(http: Client, upstream: &UpstreamConfig, credentials: CredentialsConfig) -> Self {
        Self {
            http,
            token_url: upstream.token_url.clone(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Get a valid access token, exchanging credentials if the cache is empty
    /// or expired.
    ///
    /// The cache lock is held across the exchange, so concurrent cold-cache
    /// callers collapse into a single exchange instead of issuing one each.
    pub async fn get_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(ref credential) = *cached {
            if !credential.is_expired() {
                return Ok(credential.access_token.clone());
            }
            debug!("Cached token expired, re-exchanging");
        }

        let credential = self.exchange().await?;
        let token = credential.access_token.clone();
        *cached = Some(credential);
        Ok(token)
    }

    /// Drop the cached credential unconditionally; the next [`Self::get_token`]
    /// performs a fresh exchange.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    /// Perform the client-credentials exchange
    async fn exchange(&self) -> Result<CachedCredential> {
        let (client_id, client_secret) = self.credentials.require()?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token exchange rejected");
            return Err(Error::UpstreamAuth {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        info!(expires_in = ?token.expires_in, "Acquired access token");
        Ok(CachedCredential::from_response(
            token.access_token,
            token.expires_in,
        ))
    }
}
