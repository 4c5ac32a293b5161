//! Pluggable upload preparation and verification.

use crate::save::SavedFile;
use crate::{Result, UploadError};
use async_trait::async_trait;
use packhorse_auth::Authorization;
use std::path::PathBuf;
use std::sync::Arc;

/// Where an intercepted body is persisted.
#[derive(Debug, Clone)]
pub struct UploadDestination {
    /// Directory the temporary file is created in.
    pub local_temp_dir: PathBuf,
}

/// Decides where an upload is persisted and how it is checked.
#[async_trait]
pub trait Preparer: Send + Sync {
    /// Returns the destination for the body and an optional verifier to
    /// run once it has been persisted.
    async fn prepare(
        &self,
        auth: &Authorization,
    ) -> Result<(UploadDestination, Option<Arc<dyn Verifier>>)>;
}

/// Inspects a persisted upload before the request is forwarded.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Accepts or rejects the persisted file.
    async fn verify(&self, file: &SavedFile) -> Result<()>;
}

/// Preparer that persists into the scratch directory named by the
/// authorization backend, with no verification.
#[derive(Debug, Default)]
pub struct DefaultPreparer;

#[async_trait]
impl Preparer for DefaultPreparer {
    async fn prepare(
        &self,
        auth: &Authorization,
    ) -> Result<(UploadDestination, Option<Arc<dyn Verifier>>)> {
        if auth.temp_path.is_empty() {
            return Err(UploadError::Prepare(
                "authorization returned no scratch directory".to_string(),
            ));
        }

        let destination = UploadDestination {
            local_temp_dir: PathBuf::from(&auth.temp_path),
        };
        Ok((destination, None))
    }
}
