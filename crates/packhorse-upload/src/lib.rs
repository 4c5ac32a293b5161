//! Upload body interception for the Packhorse gateway.
//!
//! Streams inbound request bodies to scratch storage while computing
//! content digests, optionally verifies the persisted file, then rewrites
//! the request as lightweight form metadata for the upstream handler.

mod error;
mod interceptor;
mod prepare;
mod save;

pub use error::UploadError;
pub use interceptor::{intercept_upload, UploadState};
pub use prepare::{DefaultPreparer, Preparer, UploadDestination, Verifier};
pub use save::{save_stream, SavedFile};

/// Result type for upload interception operations.
pub type Result<T> = std::result::Result<T, UploadError>;
