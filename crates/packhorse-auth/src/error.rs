//! Gate error types.

use thiserror::Error;

/// Errors that can occur while consulting the authorization backend.
#[derive(Debug, Error)]
pub enum GateError {
    /// The backend could not be reached or failed mid-request.
    #[error("authorization backend: {0}")]
    Backend(String),

    /// The backend answered, but not with a usable authorization payload.
    #[error("invalid authorization response: {0}")]
    InvalidResponse(String),
}
