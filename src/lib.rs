//! IGDB Metadata Proxy
//!
//! Server-side proxy for the IGDB game-metadata API. Browser clients POST
//! query bodies to an allow-listed sub-resource; the proxy injects a
//! server-held OAuth credential and relays the upstream response, so the
//! credential never reaches the browser.
//!
//! # Features
//!
//! - **Endpoint allow-listing**: only known IGDB sub-resources are forwarded
//! - **Token caching**: OAuth2 client-credentials exchange, memoized with a
//!   60 second safety margin before the reported expiry
//! - **Retry-once on 401**: a rejected token is invalidated and re-exchanged,
//!   then the upstream call is retried exactly once
//! - **CORS**: preflight handling and response decoration for browser callers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod oauth;
pub mod proxy;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
