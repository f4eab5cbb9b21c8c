//! Shared helpers: in-process mock upstreams for integration tests.
//!
//! Both mocks are small axum routers bound to an ephemeral local port, so
//! tests can assert exact call counts without touching the network.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use serde_json::json;
use tokio::sync::Mutex;

use igdb_proxy::config::{CredentialsConfig, UpstreamConfig};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Mock identity provider issuing tokens `tok-0`, `tok-1`, ... per exchange.
pub struct MockIdentity {
    /// Token endpoint URL
    pub token_url: String,
    /// Number of exchanges performed
    pub exchanges: Arc<AtomicUsize>,
}

/// Spawn a mock identity provider whose tokens report `expires_in` seconds.
pub async fn spawn_identity(expires_in: u64) -> MockIdentity {
    let exchanges = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&exchanges);

    let app = Router::new().route(
        "/oauth2/token",
        post(move |body: String| {
            let count = Arc::clone(&count);
            async move {
                let params: HashMap<String, String> = serde_urlencoded::from_str(&body).unwrap();
                assert_eq!(
                    params.get("grant_type").map(String::as_str),
                    Some("client_credentials"),
                );
                let n = count.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "access_token": format!("tok-{n}"),
                    "expires_in": expires_in,
                    "token_type": "bearer",
                }))
            }
        }),
    );

    let base = spawn_server(app).await;
    MockIdentity {
        token_url: format!("{base}/oauth2/token"),
        exchanges,
    }
}

/// What the mock metadata API saw in one forwarded request
pub struct SeenRequest {
    /// Requested sub-resource
    pub endpoint: String,
    /// `Authorization` header value
    pub authorization: Option<String>,
    /// `Client-ID` header value
    pub client_id: Option<String>,
    /// `Content-Type` header value
    pub content_type: Option<String>,
    /// Forwarded body
    pub body: String,
}

/// Mock metadata API replaying scripted `(status, body)` responses in order.
/// Once the script is exhausted it answers `200 []`.
pub struct MockUpstream {
    /// Base URL to point the forwarder at
    pub base_url: String,
    /// Number of calls received
    pub calls: Arc<AtomicUsize>,
    /// Requests as the mock saw them, in order
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

/// Spawn a mock metadata API with the given scripted responses.
pub async fn spawn_upstream(responses: Vec<(u16, &str)>) -> MockUpstream {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let script: VecDeque<(u16, String)> = responses
        .into_iter()
        .map(|(status, body)| (status, body.to_string()))
        .collect();
    let script = Arc::new(Mutex::new(script));

    let calls_handle = Arc::clone(&calls);
    let seen_handle = Arc::clone(&seen);

    let app = Router::new().route(
        "/{endpoint}",
        post(
            move |Path(endpoint): Path<String>, headers: HeaderMap, body: String| {
                let calls = Arc::clone(&calls_handle);
                let seen = Arc::clone(&seen_handle);
                let script = Arc::clone(&script);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);

                    let header_value = |name: header::HeaderName| {
                        headers
                            .get(&name)
                            .and_then(|v| v.to_str().ok())
                            .map(String::from)
                    };
                    seen.lock().await.push(SeenRequest {
                        endpoint,
                        authorization: header_value(header::AUTHORIZATION),
                        client_id: headers
                            .get("client-id")
                            .and_then(|v| v.to_str().ok())
                            .map(String::from),
                        content_type: header_value(header::CONTENT_TYPE),
                        body,
                    });

                    let (status, body) = script
                        .lock()
                        .await
                        .pop_front()
                        .unwrap_or((200, "[]".to_string()));
                    (
                        StatusCode::from_u16(status).unwrap(),
                        [(header::CONTENT_TYPE, "application/json")],
                        body,
                    )
                }
            },
        ),
    );

    let base = spawn_server(app).await;
    MockUpstream {
        base_url: base,
        calls,
        seen,
    }
}

/// Upstream config pointing at the given mock servers
pub fn upstream_config(api_base_url: &str, token_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        api_base_url: api_base_url.to_string(),
        token_url: token_url.to_string(),
        ..UpstreamConfig::default()
    }
}

/// Credentials every test uses
pub fn test_credentials() -> CredentialsConfig {
    CredentialsConfig {
        client_id: Some("test-client-id".to_string()),
        client_secret: Some("test-client-secret".to_string()),
    }
}
