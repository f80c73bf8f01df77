//! Environment overrides, captured once at process entry

use std::env;
use tracing::{debug, warn};

const USERNAME: &str = "TESTSHIP_USERNAME";
const ACCESS_KEY: &str = "TESTSHIP_ACCESS_KEY";
const LOCAL: &str = "TESTSHIP_LOCAL";
const LOCAL_IDENTIFIER: &str = "TESTSHIP_LOCAL_IDENTIFIER";
const DISABLE_USAGE_REPORTING: &str = "TESTSHIP_DISABLE_USAGE_REPORTING";
const API_URL: &str = "TESTSHIP_API_URL";
const USAGE_URL: &str = "TESTSHIP_USAGE_URL";
const DASHBOARD_URL: &str = "TESTSHIP_DASHBOARD_URL";

/// Snapshot of the `TESTSHIP_*` variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `TESTSHIP_USERNAME`
    pub username: Option<String>,
    /// `TESTSHIP_ACCESS_KEY`
    pub access_key: Option<String>,
    /// `TESTSHIP_LOCAL`
    pub local: Option<bool>,
    /// `TESTSHIP_LOCAL_IDENTIFIER`
    pub local_identifier: Option<String>,
    /// `TESTSHIP_DISABLE_USAGE_REPORTING`
    pub disable_usage_reporting: bool,
    /// `TESTSHIP_API_URL`
    pub api_url: Option<String>,
    /// `TESTSHIP_USAGE_URL`
    pub usage_url: Option<String>,
    /// `TESTSHIP_DASHBOARD_URL`
    pub dashboard_url: Option<String>,
}

impl EnvOverrides {
    /// Capture from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Capture through an arbitrary lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Blank values count as unset
        let text = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let flag = |name: &str| {
            text(name).and_then(|value| {
                let parsed = parse_bool(&value);
                if parsed.is_none() {
                    warn!(var = name, value = %value, "ignoring non-boolean value");
                }
                parsed
            })
        };

        let overrides = Self {
            username: text(USERNAME),
            access_key: text(ACCESS_KEY),
            local: flag(LOCAL),
            local_identifier: text(LOCAL_IDENTIFIER),
            disable_usage_reporting: flag(DISABLE_USAGE_REPORTING).unwrap_or(false),
            api_url: text(API_URL),
            usage_url: text(USAGE_URL),
            dashboard_url: text(DASHBOARD_URL),
        };
        debug!(
            has_username = overrides.username.is_some(),
            has_access_key = overrides.access_key.is_some(),
            local = ?overrides.local,
            "captured environment overrides"
        );
        overrides
    }
}

/// Parse a boolean flag value
///
/// Accepts: 1, true, yes, on (for true)
///          0, false, no, off (for false)
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
