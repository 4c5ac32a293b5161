//! Git proxying error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur while serving Git smart HTTP requests.
#[derive(Debug, Error)]
pub enum GitError {
    /// Invalid pkt-line format.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The authorization backend returned an empty repository path.
    #[error("authorization returned an empty repository path")]
    EmptyRepoPath,

    /// The requested service is not part of the smart protocol.
    #[error("unsupported service: {0:?}")]
    UnsupportedService(String),

    /// The POSTed RPC action is not part of the smart protocol.
    #[error("unsupported action: {0:?}")]
    UnsupportedAction(String),

    /// The authorized path does not look like a repository on disk.
    #[error("not a repository")]
    RepoNotFound,

    /// Consulting the authorization backend failed.
    #[error("pre-authorization: {0}")]
    Gate(#[from] packhorse_auth::GateError),

    /// Starting or awaiting the git subprocess failed.
    #[error(transparent)]
    Exec(#[from] packhorse_exec::ExecError),

    /// A standard stream of the subprocess was not available.
    #[error("missing {pipe} pipe for {command}")]
    MissingPipe {
        /// Which pipe was absent.
        pipe: &'static str,
        /// The command line the pipe belongs to.
        command: String,
    },

    /// Reading the client request body failed.
    #[error("read request body: {0}")]
    ReadBody(std::io::Error),

    /// Writing the client request body into the subprocess failed.
    #[error("write request body to {command}: {source}")]
    CopyIn {
        /// The command line the body was being written to.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for GitError {
    fn into_response(self) -> Response {
        match &self {
            GitError::UnsupportedService(_)
            | GitError::UnsupportedAction(_)
            | GitError::RepoNotFound => {
                tracing::debug!(error = %self, "git request rejected");
                (StatusCode::NOT_FOUND, "Not Found").into_response()
            }
            _ => {
                tracing::error!(error = %self, "git request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
