//! Route assembly for the gateway.
//!
//! Wires the git smart HTTP routes and the upload interceptor to a
//! single upstream-backed access gate, and adds the operational
//! endpoints every deployment expects.

use crate::config::Config;
use crate::proxy::{forward_upstream, ProxyState};
use crate::upstream::UpstreamGate;
use axum::body::Body;
use axum::http::Response;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use packhorse_auth::AccessGate;
use packhorse_git::GitHttpState;
use packhorse_metrics::METRICS;
use packhorse_upload::{intercept_upload, DefaultPreparer, UploadState};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Environment variables replicated into spawned git subprocesses.
const SUBPROCESS_ENV: [&str; 3] = ["HOME", "PATH", "LD_LIBRARY_PATH"];

/// Builds the complete gateway router from configuration.
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    let gate: Arc<dyn AccessGate> = Arc::new(UpstreamGate::new(config.upstream_url.clone())?);

    let git_state = GitHttpState {
        gate: gate.clone(),
        git_binary: PathBuf::from(&config.git_binary),
        base_env: base_env(),
    };

    let upload_state = UploadState {
        gate,
        preparer: Arc::new(DefaultPreparer),
    };

    let uploads = Router::new()
        .route("/api/v1/uploads", post(forward_upstream))
        .layer(middleware::from_fn_with_state(
            upload_state,
            intercept_upload,
        ))
        .with_state(ProxyState::new(config.upstream_url.clone())?);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(uploads)
        .merge(packhorse_git::router(git_state))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Environment for git subprocesses, reduced to a whitelist so gateway
/// secrets never leak into hooks.
fn base_env() -> HashMap<String, String> {
    SUBPROCESS_ENV
        .iter()
        .filter_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| (name.to_string(), value))
        })
        .collect()
}

/// Health check handler.
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Get metrics endpoint handler.
async fn metrics_handler() -> Response<Body> {
    let metrics_output = METRICS.encode();

    Response::builder()
        .status(200)
        .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
        .body(Body::from(metrics_output))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(500)
                .body(Body::from("Failed to encode metrics"))
                .expect("Failed to build error response")
        })
}
