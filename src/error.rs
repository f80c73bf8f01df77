//! Error types and telemetry error codes

use crate::messages::validation;
use regex::Regex;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Failures loading the run configuration file
///
/// These all happen before a configuration exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File does not exist
    #[error("configuration file not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// File exists but cannot be read by this user
    #[error("permission denied reading configuration file: {}", path.display())]
    PermissionDenied {
        /// Path that was looked up
        path: PathBuf,
    },

    /// File is not valid JSON/TOML for the configuration schema
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// Path of the malformed file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Any other read failure
    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        /// Path that was looked up
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Classify an I/O error raised while reading `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Unreadable { path, source: err },
        }
    }

    /// Telemetry code for this failure
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::ConfigNotFound,
            Self::PermissionDenied { .. } => ErrorCode::ConfigNoPermission,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::Unreadable { .. } => ErrorCode::ConfigInvalidUnknown,
        }
    }
}

/// Configuration rejected against the remote service's constraints
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing configured at all
    #[error("{}", validation::EMPTY_CONFIG)]
    EmptyConfig,

    /// Username or access key missing
    #[error("{}", validation::INCORRECT_AUTH_PARAMS)]
    MissingAuth,

    /// Placeholder credentials still in place
    #[error("{}", validation::INVALID_DEFAULT_AUTH_PARAMS)]
    DefaultAuth,

    /// No browsers to run on
    #[error("{}", validation::EMPTY_BROWSER_LIST)]
    EmptyBrowserList,

    /// No `run_settings` section
    #[error("{}", validation::EMPTY_RUN_SETTINGS)]
    EmptyRunSettings,

    /// No `run_settings.project_dir`
    #[error("{}", validation::EMPTY_PROJECT_DIR)]
    EmptyProjectDir,

    /// Project dir missing or not a directory
    #[error("{}", validation::INCORRECT_DIRECTORY_STRUCTURE)]
    IncorrectDirectoryStructure,

    /// Parallels outside the accepted range
    #[error("{}", validation::INVALID_PARALLELS_CONFIGURATION)]
    InvalidParallels,

    /// A configuration field held a value of the wrong type
    #[error("Invalid value for {field} in the configuration file: {message}")]
    InvalidField {
        /// Dotted field path
        field: String,
        /// Why the value was rejected
        message: String,
    },

    /// Framework config missing or malformed
    #[error("{message} {}", validation::FRAMEWORK_CONFIG_HINT)]
    InvalidFrameworkConfig {
        /// What went wrong reading it
        message: String,
    },

    /// Local `base_url` without a tunnel
    #[error("{}", validation::LOCAL_NOT_SET)]
    LocalNotSet,

    /// Spec patterns matched nothing
    #[error("{}", validation::NO_SPEC_FILES)]
    NoSpecFiles,

    /// Opaque failure text from an external validator
    #[error("{0}")]
    Other(String),
}

impl ValidationError {
    /// Telemetry code for this failure
    ///
    /// Opaque messages fall back to text classification.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyConfig => ErrorCode::ConfigInvalidEmpty,
            Self::MissingAuth => ErrorCode::ConfigInvalidMissingKeys,
            Self::DefaultAuth => ErrorCode::ConfigDefaultAuthKeys,
            Self::EmptyBrowserList => ErrorCode::ConfigInvalidNoBrowsers,
            Self::EmptyRunSettings => ErrorCode::ConfigInvalidNoRunSettings,
            Self::EmptyProjectDir => ErrorCode::ConfigInvalidNoProjectDir,
            Self::IncorrectDirectoryStructure => ErrorCode::InvalidDirectoryStructure,
            Self::InvalidParallels => ErrorCode::InvalidParallelsSpecified,
            Self::InvalidField { .. } => ErrorCode::ConfigInvalidUnknown,
            Self::InvalidFrameworkConfig { .. } => ErrorCode::InvalidFrameworkConfig,
            Self::LocalNotSet => ErrorCode::BaseUrlNoLocal,
            Self::NoSpecFiles => ErrorCode::NoSpecFilesFound,
            Self::Other(message) => ErrorCode::from_message(message),
        }
    }
}

/// Main error type for testship
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Packaging the project failed
    #[error("archive error: {0}")]
    Archive(String),

    /// Remote storage rejected the artifact
    #[error("upload failed: {0}")]
    Upload(String),

    /// Remote service refused to create the build
    #[error("build creation failed: {0}")]
    Build(String),

    /// Local artifact could not be removed
    #[error("failed to delete {}: {source}", path.display())]
    Cleanup {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Zip writer error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Bad glob in spec or exclude patterns
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Invalid argument provided
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes carried by usage reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Configuration file is not valid JSON/TOML
    ConfigParseError,
    /// Configuration file not readable by this user
    ConfigNoPermission,
    /// Configuration file does not exist
    ConfigNotFound,
    /// Configuration could not be loaded for another reason
    ConfigInvalidUnknown,
    /// Configuration is empty
    ConfigInvalidEmpty,
    /// Credentials missing
    ConfigInvalidMissingKeys,
    /// Placeholder credentials
    ConfigDefaultAuthKeys,
    /// No browsers
    ConfigInvalidNoBrowsers,
    /// No run settings
    ConfigInvalidNoRunSettings,
    /// No project dir
    ConfigInvalidNoProjectDir,
    /// Parallels out of range
    InvalidParallelsSpecified,
    /// Local base URL without tunnel
    BaseUrlNoLocal,
    /// Project dir is not a directory
    InvalidDirectoryStructure,
    /// Framework config missing or malformed
    InvalidFrameworkConfig,
    /// No spec files matched
    NoSpecFilesFound,
    /// Archiving failed
    ZipCreationFailed,
    /// Upload failed
    ZipUploadFailed,
    /// Build creation failed
    BuildFailed,
    /// Nothing matched
    UnclassifiedError,
}

/// Exact validation messages and their codes
const EXACT_MESSAGES: &[(&str, ErrorCode)] = &[
    (validation::EMPTY_CONFIG, ErrorCode::ConfigInvalidEmpty),
    (validation::INCORRECT_AUTH_PARAMS, ErrorCode::ConfigInvalidMissingKeys),
    (validation::INVALID_DEFAULT_AUTH_PARAMS, ErrorCode::ConfigDefaultAuthKeys),
    (validation::EMPTY_BROWSER_LIST, ErrorCode::ConfigInvalidNoBrowsers),
    (validation::EMPTY_RUN_SETTINGS, ErrorCode::ConfigInvalidNoRunSettings),
    (validation::EMPTY_PROJECT_DIR, ErrorCode::ConfigInvalidNoProjectDir),
    (validation::INVALID_PARALLELS_CONFIGURATION, ErrorCode::InvalidParallelsSpecified),
    (validation::LOCAL_NOT_SET, ErrorCode::BaseUrlNoLocal),
    (validation::INCORRECT_DIRECTORY_STRUCTURE, ErrorCode::InvalidDirectoryStructure),
    (validation::NO_SPEC_FILES, ErrorCode::NoSpecFilesFound),
];

/// Substring patterns for text that matches no exact message
static MESSAGE_PATTERNS: LazyLock<Vec<(Regex, ErrorCode)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"Please use --framework-config").unwrap(),
            ErrorCode::InvalidFrameworkConfig,
        ),
        (
            Regex::new(r"(?i)permission denied").unwrap(),
            ErrorCode::ConfigNoPermission,
        ),
        (
            Regex::new(r"(?i)no such file or directory").unwrap(),
            ErrorCode::ConfigNotFound,
        ),
        (
            Regex::new(r"(?i)(expected .+|EOF while parsing .+) at line \d+ column \d+").unwrap(),
            ErrorCode::ConfigParseError,
        ),
    ]
});

impl ErrorCode {
    /// Wire representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigParseError => "config_parse_error",
            Self::ConfigNoPermission => "config_no_permission",
            Self::ConfigNotFound => "config_not_found",
            Self::ConfigInvalidUnknown => "config_invalid_unknown",
            Self::ConfigInvalidEmpty => "config_invalid_empty",
            Self::ConfigInvalidMissingKeys => "config_invalid_missing_keys",
            Self::ConfigDefaultAuthKeys => "config_default_auth_keys",
            Self::ConfigInvalidNoBrowsers => "config_invalid_no_browsers",
            Self::ConfigInvalidNoRunSettings => "config_invalid_no_run_settings",
            Self::ConfigInvalidNoProjectDir => "config_invalid_no_project_dir",
            Self::InvalidParallelsSpecified => "invalid_parallels_specified",
            Self::BaseUrlNoLocal => "base_url_no_local",
            Self::InvalidDirectoryStructure => "invalid_directory_structure",
            Self::InvalidFrameworkConfig => "invalid_framework_config",
            Self::NoSpecFilesFound => "no_spec_files_found",
            Self::ZipCreationFailed => "zip_creation_failed",
            Self::ZipUploadFailed => "zip_upload_failed",
            Self::BuildFailed => "build_failed",
            Self::UnclassifiedError => "unclassified_error",
        }
    }

    /// Classify free-form failure text
    ///
    /// Exact validation messages win over substring patterns; anything
    /// else is [`ErrorCode::UnclassifiedError`].
    pub fn from_message(message: &str) -> Self {
        let message = message.trim();
        if let Some((_, code)) = EXACT_MESSAGES.iter().find(|(m, _)| *m == message) {
            return *code;
        }
        MESSAGE_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(message))
            .map_or(Self::UnclassifiedError, |(_, code)| *code)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_message_classification() {
        assert_eq!(
            ErrorCode::from_message(validation::INVALID_PARALLELS_CONFIGURATION),
            ErrorCode::InvalidParallelsSpecified
        );
        assert_eq!(
            ErrorCode::from_message(&format!("  {}\n", validation::EMPTY_BROWSER_LIST)),
            ErrorCode::ConfigInvalidNoBrowsers
        );
    }

    #[test]
    fn test_pattern_classification() {
        assert_eq!(
            ErrorCode::from_message("framework.json is broken. Please use --framework-config <path>."),
            ErrorCode::InvalidFrameworkConfig
        );
        assert_eq!(
            ErrorCode::from_message("expected `,` or `}` at line 3 column 5"),
            ErrorCode::ConfigParseError
        );
        assert_eq!(
            ErrorCode::from_message("open failed: Permission denied (os error 13)"),
            ErrorCode::ConfigNoPermission
        );
    }

    #[test]
    fn test_unknown_message_is_unclassified() {
        assert_eq!(
            ErrorCode::from_message("the remote service is having a bad day"),
            ErrorCode::UnclassifiedError
        );
    }

    #[test]
    fn test_serialized_code_matches_as_str() {
        for code in [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidParallelsSpecified,
            ErrorCode::ZipUploadFailed,
            ErrorCode::UnclassifiedError,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_config_error_from_io_kind() {
        let path = Path::new("testship.json");
        let not_found = ConfigError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(not_found.code(), ErrorCode::ConfigNotFound);

        let denied = ConfigError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.code(), ErrorCode::ConfigNoPermission);

        let other = ConfigError::from_io(path, io::Error::other("disk on fire"));
        assert_eq!(other.code(), ErrorCode::ConfigInvalidUnknown);
    }

    #[test]
    fn test_opaque_validation_error_uses_text_lookup() {
        let err = ValidationError::Other(validation::LOCAL_NOT_SET.to_string());
        assert_eq!(err.code(), ErrorCode::BaseUrlNoLocal);

        let err = ValidationError::Other("quota exceeded".to_string());
        assert_eq!(err.code(), ErrorCode::UnclassifiedError);
    }
}
