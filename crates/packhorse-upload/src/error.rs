//! Upload interception error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur while intercepting an upload body.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Consulting the authorization backend failed.
    #[error("pre-authorization: {0}")]
    Gate(#[from] packhorse_auth::GateError),

    /// The preparer could not produce an upload destination.
    #[error("prepare upload: {0}")]
    Prepare(String),

    /// The verifier rejected the persisted file.
    #[error("verify upload: {0}")]
    Verify(String),

    /// Persisting the body to scratch storage failed.
    #[error("save upload body: {0}")]
    SaveFile(#[from] std::io::Error),

    /// Encoding the rewritten metadata fields failed.
    #[error("encode upload fields: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "upload interception failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
