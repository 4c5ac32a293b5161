//! The access gate capability.

use crate::Result;
use async_trait::async_trait;
use axum::http::request::Parts;
use axum::response::Response;
use serde::{Deserialize, Serialize};

/// Routing metadata produced by a successful authorization.
///
/// Lives for one request and is never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authorization {
    /// Filesystem path of the authorized repository. Empty when the
    /// request does not target a repository.
    #[serde(default)]
    pub repo_path: String,
    /// Opaque actor identity, forwarded to subprocesses via the
    /// environment.
    #[serde(default)]
    pub actor_id: String,
    /// Scratch directory for temporary files created on behalf of this
    /// request.
    #[serde(default)]
    pub temp_path: String,
}

/// Outcome of consulting the gate.
#[derive(Debug)]
pub enum GateDecision {
    /// The request may proceed with the given routing metadata.
    Allow(Authorization),
    /// The backend refused; its response is returned to the client as-is.
    Deny(Response),
}

/// Validates a request against the authorization backend before any
/// expensive work begins.
///
/// `suffix` is appended to the request path when the backend distinguishes
/// authorization endpoints per route (for example `/authorize` for
/// uploads); the Git routes pass an empty suffix.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Authorizes the request described by `request`.
    async fn authorize(&self, request: &Parts, suffix: &str) -> Result<GateDecision>;
}
