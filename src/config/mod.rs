//! Run configuration
//!
//! A [`RunConfiguration`] is resolved once per invocation from the config
//! file, CLI overrides ([`RunArgs`]) and the captured environment
//! ([`EnvOverrides`]). Stages only ever read it; the one late value,
//! resolved parallelism, is applied by [`RunConfiguration::with_parallels`]
//! which consumes the provisional configuration.

mod endpoints;
mod env;
mod file;
mod resolve;

pub use endpoints::{DEFAULT_API_URL, DEFAULT_DASHBOARD_URL, DEFAULT_USAGE_URL, Endpoints};
pub use env::{EnvOverrides, parse_bool};
pub use file::{
    AuthSection, BrowserSpec, ConfigFile, ConnectionSettings, DEFAULT_CONFIG_FILE,
    DEFAULT_FRAMEWORK_CONFIG, FieldIssue, ParallelsSetting, RunSettings, parallels_in_range,
};
pub use resolve::FileConfigResolver;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default delay between build status requests in synchronous mode
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Overrides supplied on the command line for one `run` invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Path to the run configuration file
    pub config_file: PathBuf,
    /// Username override
    #[serde(skip)]
    pub username: Option<String>,
    /// Access key override
    #[serde(skip)]
    pub access_key: Option<String>,
    /// Build name override
    pub build_name: Option<String>,
    /// Parallels override; range-checked during validation
    pub parallels: Option<i64>,
    /// Framework config path override
    pub framework_config: Option<PathBuf>,
    /// Spec glob filters
    pub specs: Vec<String>,
    /// Test environment variables
    pub env: BTreeMap<String, String>,
    /// Extra exclude globs for packaging
    pub exclude: Vec<String>,
    /// Silence the empty-dependencies advisory
    pub disable_dependency_warning: bool,
    /// Opt out of usage reporting
    pub disable_usage_reporting: bool,
    /// Wait for the remote build to finish
    pub sync: bool,
}

/// Account credentials for the remote service
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account username
    pub username: String,
    /// Account access key
    pub access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Fully merged configuration for one run
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunConfiguration {
    /// File the configuration was read from
    pub config_path: PathBuf,
    /// Account credentials
    pub credentials: Credentials,
    /// Browser matrix
    pub browsers: Vec<BrowserSpec>,
    /// Run settings with CLI overrides applied and paths made absolute
    pub run_settings: RunSettings,
    /// Whether the file declared a `run_settings` section
    pub run_settings_declared: bool,
    /// Whether the framework config path was given explicitly
    pub framework_config_explicit: bool,
    /// Route traffic through a local tunnel
    pub local: bool,
    /// Tunnel identifier
    pub local_identifier: Option<String>,
    /// Send usage reports
    pub usage_reporting: bool,
    /// Show the empty-dependencies advisory
    pub dependency_warning: bool,
    /// Wait for the build to reach a terminal state
    pub sync: bool,
    /// Parallels after resolution against the spec count
    pub parallels: Option<i64>,
    /// File fields that held a value of the wrong type
    pub invalid_fields: Vec<FieldIssue>,
}

impl RunConfiguration {
    /// Nothing configured: no credentials, browsers or run settings
    pub fn is_blank(&self) -> bool {
        self.credentials.username.is_empty()
            && self.credentials.access_key.is_empty()
            && self.browsers.is_empty()
            && !self.run_settings_declared
    }

    /// Finalize with the resolved parallels
    #[must_use]
    pub fn with_parallels(mut self, parallels: Option<i64>) -> Self {
        self.parallels = parallels;
        self
    }

    /// Build name, if any
    pub fn build_name(&self) -> Option<&str> {
        self.run_settings.build_name.as_deref()
    }

    /// Delay between status requests in synchronous mode
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.run_settings
                .poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    /// Number of browser/OS/version combinations in the matrix
    pub fn browser_combinations(&self) -> usize {
        self.browsers
            .iter()
            .map(|b| b.versions.len().max(1))
            .sum()
    }
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            credentials: Credentials::default(),
            browsers: Vec::new(),
            run_settings: RunSettings::default(),
            run_settings_declared: false,
            framework_config_explicit: false,
            local: false,
            local_identifier: None,
            usage_reporting: true,
            dependency_warning: true,
            sync: false,
            parallels: None,
            invalid_fields: Vec::new(),
        }
    }
}

/// Loads and merges the run configuration
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    /// Resolve the configuration for `args`
    async fn resolve(&self, args: &RunArgs) -> Result<RunConfiguration>;
}
