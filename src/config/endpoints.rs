//! Remote service endpoints

use crate::config::EnvOverrides;
use tracing::warn;
use url::Url;

/// Hosted API base
pub const DEFAULT_API_URL: &str = "https://api.testship.dev/v1";
/// Hosted usage-report endpoint
pub const DEFAULT_USAGE_URL: &str = "https://usage.testship.dev/v1/events";
/// Hosted dashboard base
pub const DEFAULT_DASHBOARD_URL: &str = "https://app.testship.dev";

/// Where the remote collaborators send their requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// API base; upload and build paths are appended
    pub api: String,
    /// Usage-report endpoint
    pub usage: String,
    /// Dashboard base
    pub dashboard: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api: DEFAULT_API_URL.to_string(),
            usage: DEFAULT_USAGE_URL.to_string(),
            dashboard: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Apply environment overrides; unusable URLs keep the default
    pub fn from_overrides(env: &EnvOverrides) -> Self {
        Self {
            api: checked("TESTSHIP_API_URL", env.api_url.as_deref(), DEFAULT_API_URL),
            usage: checked("TESTSHIP_USAGE_URL", env.usage_url.as_deref(), DEFAULT_USAGE_URL),
            dashboard: checked(
                "TESTSHIP_DASHBOARD_URL",
                env.dashboard_url.as_deref(),
                DEFAULT_DASHBOARD_URL,
            ),
        }
    }

    /// API URL for `path` (which starts with `/`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api.trim_end_matches('/'))
    }

    /// Dashboard page for a build
    pub fn build_dashboard_url(&self, build_id: &str) -> String {
        format!(
            "{}/builds/{}",
            self.dashboard.trim_end_matches('/'),
            urlencoding::encode(build_id)
        )
    }
}

fn checked(var: &str, value: Option<&str>, default: &str) -> String {
    let Some(value) = value else {
        return default.to_string();
    };
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            value.trim_end_matches('/').to_string()
        }
        _ => {
            warn!(var, value, "ignoring invalid endpoint URL, using default");
            default.to_string()
        }
    }
}
