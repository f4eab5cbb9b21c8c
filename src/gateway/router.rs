//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reqwest::Client;
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::config::Config;
use crate::oauth::TokenManager;
use crate::proxy::Forwarder;
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Proxy forwarder
    pub forwarder: Forwarder,
    /// `Cache-Control` value attached to successful relays
    pub cache_control: String,
}

impl AppState {
    /// Wire the token manager and forwarder from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.upstream.request_timeout)
            .build()?;

        let tokens = Arc::new(TokenManager::new(
            http.clone(),
            &config.upstream,
            config.credentials.clone(),
        ));
        let forwarder = Forwarder::new(http, &config.upstream, &config.credentials, tokens);

        Ok(Self {
            forwarder,
            cache_control: config.cache.header_value(),
        })
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/igdb/{endpoint}",
            post(proxy_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler),
        )
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::new(config.server.request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(cors_layer(&config.cors.allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer from the configured allowed origin.
/// Methods and headers match the inbound contract: POST/OPTIONS, Content-Type.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origin == "*" {
        return cors.allow_origin(Any);
    }

    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!(origin = %allowed_origin, "Invalid allowed origin, falling back to *");
            cors.allow_origin(Any)
        }
    }
}

/// POST /api/igdb/{endpoint} - the proxy operation
async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    body: String,
) -> Response {
    match state.forwarder.forward(&endpoint, &body).await {
        Ok(value) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, state.cache_control.clone())],
            Json(value),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// OPTIONS /api/igdb/{endpoint} - answered 200 with an empty body.
/// Real preflights are short-circuited by the CORS layer before reaching
/// this handler.
async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

/// Any other method on the proxy route
async fn method_not_allowed_handler() -> Response {
    error_response(&Error::MethodNotAllowed)
}

/// Health check handler
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Map an error to its HTTP response envelope
fn error_response(err: &Error) -> Response {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = match err {
        Error::InvalidRequest(msg) => json!({ "error": msg }),
        Error::MethodNotAllowed => json!({ "error": "Use POST" }),
        Error::Upstream { body, .. } => json!({
            "error": "IGDB request failed",
            "details": body,
        }),
        _ => {
            error!(error = %err, "Proxy error");
            json!({
                "error": "Internal proxy error",
                "message": err.to_string(),
            })
        }
    };

    (status, Json(body)).into_response()
}
