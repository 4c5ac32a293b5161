//! Subprocess error types.

use thiserror::Error;

/// Errors that can occur while controlling a subprocess.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The command could not be started.
    #[error("start {command}: {source}")]
    Spawn {
        /// The command line that failed to start.
        command: String,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The command could not be awaited.
    #[error("wait for {command}: {source}")]
    Wait {
        /// The command line that could not be awaited.
        command: String,
        /// The underlying OS error.
        source: std::io::Error,
    },
}
