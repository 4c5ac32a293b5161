//! Pre-authorization gate for the Packhorse gateway.
//!
//! Every intercepted request is validated against the upstream backend
//! before any expensive work starts. The backend's answer carries the
//! routing metadata (repository path, actor identity, scratch directory)
//! that the downstream handlers need; a refusal is terminal and is passed
//! through to the client verbatim.

mod actor;
mod error;
mod gate;

pub use actor::{ActorClass, CI_USERNAME};
pub use error::GateError;
pub use gate::{AccessGate, Authorization, GateDecision};

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
