//! Plain reverse proxy for requests the gateway does not handle itself.
//!
//! Used as the downstream of the upload interceptor: by the time a
//! request reaches this handler its body has already been rewritten to
//! the small metadata form, so buffering it is cheap.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Largest request body the proxy will buffer before forwarding.
const FORWARD_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    Client(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Proxying to upstream failed");
        (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
    }
}

/// Shared state for the forwarding handler.
#[derive(Clone)]
pub struct ProxyState {
    client: Client,
    base_url: String,
}

impl ProxyState {
    /// Creates a proxy that forwards to the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .user_agent(concat!("packhorse/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

/// Forwards the request to the backend and relays the response.
pub async fn forward_upstream(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.base_url, path_and_query);

    let body = to_bytes(body, FORWARD_BODY_LIMIT)
        .await
        .map_err(|e| ProxyError::Client(e.to_string()))?;

    let mut headers = parts.headers.clone();
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);

    let upstream = state
        .client
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let mut response = Response::builder().status(upstream.status());
    for (name, value) in upstream.headers() {
        if name == header::CONNECTION
            || name == header::TRANSFER_ENCODING
            || name == header::CONTENT_LENGTH
        {
            continue;
        }
        response = response.header(name.clone(), value.clone());
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ProxyError::Upstream(e.to_string()))
}
