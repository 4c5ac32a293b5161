//! Git smart HTTP proxying for the Packhorse gateway.
//!
//! This crate implements the server side of Git's smart HTTP protocol by
//! delegating to a local `git` subprocess: reference advertisement for
//! `info/refs` and stateless RPC for `git-upload-pack` and
//! `git-receive-pack`, with shallow-clone detection on the upload-pack
//! path.

mod error;
mod http;
mod pktline;

pub use error::GitError;
pub use http::{router, GitHttpState, ACTOR_ID_ENV};
pub use pktline::{scan_deepen, PktLine, PktLineReader};

/// Result type for git proxying operations.
pub type Result<T> = std::result::Result<T, GitError>;
