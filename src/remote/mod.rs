//! Remote execution service
//!
//! The pipeline talks to the service through three narrow traits so each
//! step can be swapped or faked independently.

mod client;

pub use client::RemoteClient;

use crate::config::RunConfiguration;
use crate::error::Result;
use crate::types::{BuildRecord, BuildStatus, UploadHandle};
use async_trait::async_trait;
use std::path::Path;

/// Pushes the local artifact to remote storage
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Upload the archive at `artifact`
    async fn upload(&self, config: &RunConfiguration, artifact: &Path) -> Result<UploadHandle>;
}

/// Registers builds with the remote service
#[async_trait]
pub trait BuildSubmitter: Send + Sync {
    /// Create a build running the uploaded artifact
    async fn create_build(
        &self,
        config: &RunConfiguration,
        upload: &UploadHandle,
    ) -> Result<BuildRecord>;
}

/// Reads the state of a remote build
#[async_trait]
pub trait BuildStatusSource: Send + Sync {
    /// Current status of `build_id`
    async fn build_status(&self, config: &RunConfiguration, build_id: &str) -> Result<BuildStatus>;
}
