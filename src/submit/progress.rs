//! Progress callback trait for interface-agnostic updates
//!
//! This trait allows different interfaces (CLI, CI log collectors, tests)
//! to receive progress updates while a run is submitted.

use crate::error::Error;
use crate::types::{BuildRecord, BuildStatus, SyncExit};
use async_trait::async_trait;

/// Submission stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading and merging configuration
    LoadingConfig,
    /// Checking configuration against service constraints
    ValidatingCapabilities,
    /// Discovering spec files
    ResolvingManifest,
    /// Matching parallels to the work available
    SettingParallelism,
    /// Packaging the project
    Archiving,
    /// Uploading the artifact
    Uploading,
    /// Registering the build
    CreatingBuild,
    /// Waiting for the build to finish
    Polling,
}

impl Stage {
    /// Process exit code when this stage fails
    ///
    /// Codes follow `sysexits.h`; polling never fails the process this way.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::LoadingConfig => 78,
            Self::ValidatingCapabilities | Self::ResolvingManifest | Self::SettingParallelism => 65,
            Self::Archiving => 74,
            Self::Uploading => 69,
            Self::CreatingBuild => 70,
            Self::Polling => 2,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadingConfig => write!(f, "Loading configuration"),
            Self::ValidatingCapabilities => write!(f, "Validating configuration"),
            Self::ResolvingManifest => write!(f, "Finding spec files"),
            Self::SettingParallelism => write!(f, "Setting parallels"),
            Self::Archiving => write!(f, "Packaging project"),
            Self::Uploading => write!(f, "Uploading tests"),
            Self::CreatingBuild => write!(f, "Creating build"),
            Self::Polling => write!(f, "Waiting for build"),
        }
    }
}

/// Progress callback trait
///
/// Implement this trait to receive progress updates during submission.
/// - CLI implementations can print to terminal
/// - Tests can record what was shown
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when entering a new stage
    async fn on_stage(&self, stage: Stage);

    /// Called with a general status message
    async fn on_message(&self, message: &str);

    /// Called with a non-fatal advisory
    async fn on_warning(&self, message: &str);

    /// Called when an error occurs
    async fn on_error(&self, error: &Error);

    /// Called once the build exists, with the success message
    async fn on_build_created(&self, build: &BuildRecord, message: &str);

    /// Called when a polled build changes status
    async fn on_build_status(&self, build_id: &str, status: BuildStatus);

    /// Called when polling ends
    async fn on_sync_complete(&self, exit: SyncExit);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_stage(&self, _stage: Stage) {}
    async fn on_message(&self, _message: &str) {}
    async fn on_warning(&self, _message: &str) {}
    async fn on_error(&self, _error: &Error) {}
    async fn on_build_created(&self, _build: &BuildRecord, _message: &str) {}
    async fn on_build_status(&self, _build_id: &str, _status: BuildStatus) {}
    async fn on_sync_complete(&self, _exit: SyncExit) {}
}
