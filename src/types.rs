//! Core types used throughout testship

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Test framework settings read from the project's framework config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Application URL the specs run against
    pub base_url: Option<String>,
    /// Spec folder relative to the project dir
    pub spec_dir: Option<String>,
}

/// Validated description of the project to submit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectManifest {
    /// Absolute project root
    pub project_dir: PathBuf,
    /// Spec files, relative to `project_dir`, sorted
    pub spec_files: Vec<PathBuf>,
    /// Parallels requested by CLI or config, already range-checked
    pub parallels: Option<i64>,
    /// Framework settings
    pub framework: FrameworkConfig,
}

/// Local archive produced by the archiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    /// Location of the zip
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Remote reference to an uploaded artifact
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadHandle {
    /// URL returned by remote storage
    #[serde(rename = "zip_url")]
    pub url: String,
}

/// Build registered with the remote service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildRecord {
    /// Build identifier
    pub build_id: String,
    /// Human message from the service
    pub message: String,
    /// Dashboard page for the build
    pub dashboard_url: String,
}

/// Remote build state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Waiting for machines
    Queued,
    /// Specs executing
    Running,
    /// All specs passed
    Passed,
    /// At least one spec failed
    Failed,
    /// Infrastructure error
    Error,
    /// Build exceeded its time budget
    Timeout,
    /// Build stopped by a user
    Stopped,
    /// Status this client does not know; treated as still running
    #[serde(other)]
    Unknown,
}

impl BuildStatus {
    /// Exit for a terminal status, `None` while the build is in flight
    pub const fn terminal_exit(self) -> Option<SyncExit> {
        match self {
            Self::Passed => Some(SyncExit::Passed),
            Self::Failed => Some(SyncExit::Failed),
            Self::Error | Self::Timeout | Self::Stopped => Some(SyncExit::Errored),
            Self::Queued | Self::Running | Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timed out"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// How synchronous polling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncExit {
    /// Tests passed
    Passed,
    /// Tests failed
    Failed,
    /// Build or polling broke down
    Errored,
    /// User stopped waiting
    Interrupted,
}

impl SyncExit {
    /// Process exit code
    pub const fn code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed => 1,
            Self::Errored => 2,
            Self::Interrupted => 130,
        }
    }
}

/// Usage-report message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Run submitted
    Success,
    /// Run failed before a build existed
    Error,
}

/// Terminal result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Build created
    Success {
        /// Build message line
        message: String,
        /// Dashboard link line
        dashboard_link: String,
    },
    /// A stage failed
    Failure {
        /// Classified error code
        code: ErrorCode,
        /// Message forwarded to telemetry
        message: String,
    },
}

impl Outcome {
    /// Message type for usage reporting
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success { .. } => OutcomeKind::Success,
            Self::Failure { .. } => OutcomeKind::Error,
        }
    }

    /// Error code, `None` on success
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { code, .. } => Some(*code),
        }
    }

    /// Message forwarded to telemetry
    pub fn report_message(&self) -> String {
        match self {
            Self::Success {
                message,
                dashboard_link,
            } => format!("{message}\n{dashboard_link}"),
            Self::Failure { message, .. } => message.clone(),
        }
    }
}
