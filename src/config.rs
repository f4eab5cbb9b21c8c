//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Environment files to load before resolving credentials.
    /// Loaded in order, later files override earlier. Files that don't
    /// exist are silently skipped.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream endpoints (identity provider and metadata API)
    pub upstream: UpstreamConfig,
    /// OAuth client credentials
    pub credentials: CredentialsConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Response-caching directive attached to successful relays
    pub cache: CacheControlConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (IGDB_PROXY_ prefix)
        figment = figment.merge(Env::prefixed("IGDB_PROXY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into the process environment first, so the
        // conventional variables below can come from them.
        config.load_env_files();
        config.resolve_env(|key| env::var(key).ok());

        Ok(config)
    }

    /// Load environment files into the process environment.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let path = Path::new(path_str);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {path_str}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {path_str}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {path_str}");
            }
        }
    }

    /// Fill credentials and the allowed origin from the conventional
    /// environment variables. `CLIENT_ID` / `CLIENT_SECRET` apply only when
    /// the file left them unset; `ALLOWED_ORIGIN` overrides the file.
    fn resolve_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if self.credentials.client_id.is_none() {
            self.credentials.client_id = get("CLIENT_ID");
        }
        if self.credentials.client_secret.is_none() {
            self.credentials.client_secret = get("CLIENT_SECRET");
        }
        if let Some(origin) = get("ALLOWED_ORIGIN") {
            self.cors.allowed_origin = origin;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Inbound request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8400,
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Upstream endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the metadata API
    pub api_base_url: String,
    /// OAuth2 token endpoint of the identity provider
    pub token_url: String,
    /// Timeout for outbound calls (token exchange and forwarding)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.igdb.com/v4".to_string(),
            token_url: "https://id.twitch.tv/oauth2/token".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// OAuth client credentials for the client-credentials exchange.
///
/// Missing credentials do not prevent startup; every proxied request fails
/// with a configuration error until they are set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    /// OAuth client id (falls back to the `CLIENT_ID` environment variable)
    pub client_id: Option<String>,
    /// OAuth client secret (falls back to `CLIENT_SECRET`)
    pub client_secret: Option<String>,
}

impl CredentialsConfig {
    /// Both credentials, or a configuration error naming the missing variables
    pub fn require(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(Error::Config(
                "Missing CLIENT_ID or CLIENT_SECRET environment variables".to_string(),
            )),
        }
    }

    /// Whether both credentials are present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value for `Access-Control-Allow-Origin` (falls back to the
    /// `ALLOWED_ORIGIN` environment variable)
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
        }
    }
}

/// Response-caching directive for successful relays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheControlConfig {
    /// Shared-cache freshness window
    #[serde(with = "humantime_serde")]
    pub s_maxage: Duration,
    /// Stale-while-revalidate window
    #[serde(with = "humantime_serde")]
    pub stale_while_revalidate: Duration,
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            s_maxage: Duration::from_secs(300),
            stale_while_revalidate: Duration::from_secs(600),
        }
    }
}

impl CacheControlConfig {
    /// Render the `Cache-Control` header value
    #[must_use]
    pub fn header_value(&self) -> String {
        format!(
            "s-maxage={}, stale-while-revalidate={}",
            self.s_maxage.as_secs(),
            self.stale_while_revalidate.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8400);
        assert_eq!(config.upstream.api_base_url, "https://api.igdb.com/v4");
        assert_eq!(config.upstream.token_url, "https://id.twitch.tv/oauth2/token");
        assert_eq!(config.cors.allowed_origin, "*");
        assert!(config.credentials.client_id.is_none());
    }

    #[test]
    fn test_cache_control_header_value() {
        let cache = CacheControlConfig::default();
        assert_eq!(
            cache.header_value(),
            "s-maxage=300, stale-while-revalidate=600"
        );
    }

    #[test]
    fn test_resolve_env_fills_missing_credentials() {
        let mut config = Config::default();
        config.resolve_env(|key| match key {
            "CLIENT_ID" => Some("cid".to_string()),
            "CLIENT_SECRET" => Some("secret".to_string()),
            "ALLOWED_ORIGIN" => Some("https://games.example".to_string()),
            _ => None,
        });

        assert_eq!(config.credentials.client_id.as_deref(), Some("cid"));
        assert_eq!(config.credentials.client_secret.as_deref(), Some("secret"));
        assert_eq!(config.cors.allowed_origin, "https://games.example");
    }

    #[test]
    fn test_resolve_env_keeps_file_credentials() {
        let mut config = Config::default();
        config.credentials.client_id = Some("from-file".to_string());
        config.resolve_env(|key| match key {
            "CLIENT_ID" => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(config.credentials.client_id.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_require_credentials() {
        let creds = CredentialsConfig {
            client_id: Some("cid".to_string()),
            client_secret: Some("secret".to_string()),
        };
        assert_eq!(creds.require().unwrap(), ("cid", "secret"));

        let missing = CredentialsConfig::default();
        assert!(matches!(missing.require(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\nupstream:\n  api_base_url: http://localhost:9999/v4"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.upstream.api_base_url, "http://localhost:9999/v4");
        // Untouched sections keep their defaults
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/igdb-proxy.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
