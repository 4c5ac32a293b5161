//! Authorization backend client.
//!
//! The gateway never decides access itself: every request is re-issued
//! bodyless to the upstream backend, which answers either with routing
//! metadata or with a denial that is relayed to the client verbatim.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::Response;
use packhorse_auth::{AccessGate, Authorization, GateDecision, GateError};
use reqwest::Client;
use std::time::Duration;

/// Header identifying the gateway version to the backend.
const VERSION_HEADER: &str = "Packhorse-Version";

/// Access gate that defers every decision to the upstream backend.
pub struct UpstreamGate {
    client: Client,
    base_url: String,
}

impl UpstreamGate {
    /// Creates a gate that calls the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> packhorse_auth::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("packhorse/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GateError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn callback_url(&self, request: &Parts, suffix: &str) -> String {
        match request.uri.query() {
            Some(query) => format!(
                "{}{}{}?{}",
                self.base_url,
                request.uri.path(),
                suffix,
                query
            ),
            None => format!("{}{}{}", self.base_url, request.uri.path(), suffix),
        }
    }
}

#[async_trait]
impl AccessGate for UpstreamGate {
    async fn authorize(
        &self,
        request: &Parts,
        suffix: &str,
    ) -> packhorse_auth::Result<GateDecision> {
        let url = self.callback_url(request, suffix);

        // The callback mirrors the original request minus its body.
        let mut headers = request.headers.clone();
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);

        let response = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers)
            .header(VERSION_HEADER, env!("CARGO_PKG_VERSION"))
            .send()
            .await
            .map_err(|e| GateError::Backend(e.to_string()))?;

        if response.status() == StatusCode::OK {
            let auth: Authorization = response
                .json()
                .await
                .map_err(|e| GateError::InvalidResponse(e.to_string()))?;
            return Ok(GateDecision::Allow(auth));
        }

        // Anything but 200 is a denial owned by the backend.
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| GateError::Backend(e.to_string()))?;

        let mut denial = Response::builder().status(status);
        if let Some(content_type) = content_type {
            denial = denial.header(header::CONTENT_TYPE, content_type);
        }
        let denial = denial
            .body(Body::from(body))
            .map_err(|e| GateError::InvalidResponse(e.to_string()))?;

        Ok(GateDecision::Deny(denial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_for(uri: &str) -> Parts {
        let (parts, _) = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_callback_url_appends_suffix() {
        let gate = UpstreamGate::new("http://localhost:8080").unwrap();
        let parts = parts_for("/api/v1/uploads");
        assert_eq!(
            gate.callback_url(&parts, "/authorize"),
            "http://localhost:8080/api/v1/uploads/authorize"
        );
    }

    #[test]
    fn test_callback_url_keeps_query_after_suffix() {
        let gate = UpstreamGate::new("http://localhost:8080").unwrap();
        let parts = parts_for("/me/fixture.git/info/refs?service=git-upload-pack");
        assert_eq!(
            gate.callback_url(&parts, ""),
            "http://localhost:8080/me/fixture.git/info/refs?service=git-upload-pack"
        );
    }
}
