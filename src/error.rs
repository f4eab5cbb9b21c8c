//! Error types for the IGDB proxy

use std::io;

use thiserror::Error;

/// Result type alias for the IGDB proxy
pub type Result<T> = std::result::Result<T, Error>;

/// IGDB proxy errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing credentials, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-correctable request error (unknown endpoint, empty body)
    #[error("{0}")]
    InvalidRequest(String),

    /// Wrong HTTP method on the proxy route
    #[error("Use POST")]
    MethodNotAllowed,

    /// Identity provider rejected the credential exchange
    #[error("Token exchange failed ({status}): {body}")]
    UpstreamAuth {
        /// Provider HTTP status
        status: u16,
        /// Provider response body text
        body: String,
    },

    /// Metadata API rejected the forwarded request
    #[error("IGDB request failed ({status}): {body}")]
    Upstream {
        /// Upstream HTTP status, relayed to the caller
        status: u16,
        /// Upstream response body text
        body: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code this error is reported with.
    ///
    /// Upstream rejections relay the upstream status; configuration and
    /// token-exchange failures are operational faults and map to 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::MethodNotAllowed => 405,
            Self::Upstream { status, .. } => *status,
            _ => 500,
        }
    }
}
