//! Subprocess plumbing for the Packhorse gateway.
//!
//! This crate spawns external commands with an explicit, caller-supplied
//! environment, exposes their standard streams as async pipes, and
//! guarantees process-group cleanup when the handle is dropped.

mod error;
mod process;

pub use error::ExecError;
pub use process::{copy_counted, Subprocess};

/// Result type for subprocess operations.
pub type Result<T> = std::result::Result<T, ExecError>;
