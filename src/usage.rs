//! Usage reporting
//!
//! One best-effort `cli_stats` event per invocation. Reporting never fails
//! the run: transport errors are logged and dropped.

use crate::config::{RunArgs, RunConfiguration};
use crate::error::{Error, ErrorCode, Result};
use crate::types::{Outcome, OutcomeKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Usage report timeout in seconds
const REPORT_TIMEOUT_SECS: u64 = 5;

const EVENT_TYPE: &str = "cli_stats";

/// Records the outcome of an invocation
#[async_trait]
pub trait UsageReporter: Send + Sync {
    /// Record `outcome`; `config` is `None` when none could be built
    async fn report(&self, config: Option<&RunConfiguration>, args: &RunArgs, outcome: &Outcome);
}

/// Usage event envelope
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    /// Always `cli_stats`
    pub event_type: &'static str,
    /// Event body
    pub data: UsageData,
}

/// Usage event body
#[derive(Debug, Clone, Serialize)]
pub struct UsageData {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub os_arch: String,
    /// Version of this tool
    pub cli_version: String,
    /// Build name, when configured
    pub build_name: Option<String>,
    /// Account username, when known
    pub username: Option<String>,
    /// Outcome message
    pub message: String,
    /// `success` or `error`
    pub message_type: OutcomeKind,
    /// Classified code for failures
    pub error_code: Option<ErrorCode>,
    /// Command-line overrides without credentials
    pub cli_args: serde_json::Value,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

impl UsageReport {
    /// Describe `outcome` for this invocation
    pub fn new(config: Option<&RunConfiguration>, args: &RunArgs, outcome: &Outcome) -> Self {
        let username = config
            .map(|c| c.credentials.username.clone())
            .filter(|u| !u.is_empty())
            .or_else(|| args.username.clone());

        Self {
            event_type: EVENT_TYPE,
            data: UsageData {
                os: std::env::consts::OS.to_string(),
                os_arch: std::env::consts::ARCH.to_string(),
                cli_version: env!("CARGO_PKG_VERSION").to_string(),
                build_name: config
                    .and_then(RunConfiguration::build_name)
                    .map(ToString::to_string),
                username,
                message: outcome.report_message(),
                message_type: outcome.kind(),
                error_code: outcome.code(),
                cli_args: serde_json::to_value(args).unwrap_or_default(),
                timestamp: Utc::now(),
            },
        }
    }
}

/// Whether a report should be sent
///
/// With a configuration its merged flag decides; without one only the
/// CLI flag and the environment are consulted.
pub fn reporting_enabled(
    config: Option<&RunConfiguration>,
    args: &RunArgs,
    env_disabled: bool,
) -> bool {
    config.map_or(
        !(args.disable_usage_reporting || env_disabled),
        |config| config.usage_reporting,
    )
}

/// Posts usage events over HTTP
///
/// Construction never fails: without an HTTP client every report is
/// dropped, so setup failures elsewhere can still go through `report`.
pub struct HttpUsageReporter {
    client: Option<Client>,
    endpoint: String,
    env_disabled: bool,
}

impl HttpUsageReporter {
    /// Create a reporter posting to `endpoint`
    pub fn new(endpoint: String, env_disabled: bool) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REPORT_TIMEOUT_SECS))
            .build()
            .inspect_err(|e| debug!(error = %e, "usage reporting unavailable"))
            .ok();
        Self {
            client,
            endpoint,
            env_disabled,
        }
    }

    async fn send(&self, report: &UsageReport) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::Internal("no HTTP client".to_string()))?;
        client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl UsageReporter for HttpUsageReporter {
    async fn report(&self, config: Option<&RunConfiguration>, args: &RunArgs, outcome: &Outcome) {
        if !reporting_enabled(config, args, self.env_disabled) {
            debug!("usage reporting disabled");
            return;
        }

        let report = UsageReport::new(config, args, outcome);
        match self.send(&report).await {
            Ok(()) => debug!(message_type = ?report.data.message_type, "usage report sent"),
            Err(e) => debug!(error = %e, "usage report dropped"),
        }
    }
}
