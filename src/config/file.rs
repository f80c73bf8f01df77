//! On-disk configuration schema
//!
//! JSON is the default format; a `.toml` extension selects TOML. Only a
//! syntax error rejects the file. Fields holding a value of the wrong type
//! fall back to their default and are listed in
//! [`ConfigFile::invalid_fields`] for validation to report.

use crate::error::ConfigError;
use crate::messages::placeholders;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file looked up when `--config-file` is not given
pub const DEFAULT_CONFIG_FILE: &str = "testship.json";

/// Framework config looked up inside the project dir by default
pub const DEFAULT_FRAMEWORK_CONFIG: &str = "framework.json";

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigFile {
    /// Account credentials
    pub auth: AuthSection,
    /// Browser matrix
    pub browsers: Vec<BrowserSpec>,
    /// Run settings; absence is a validation error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_settings: Option<RunSettings>,
    /// Tunnel settings
    pub connection_settings: ConnectionSettings,
    /// Opt out of usage reporting
    pub disable_usage_reporting: bool,
    /// Fields whose value had the wrong type
    #[serde(skip)]
    pub invalid_fields: Vec<FieldIssue>,
}

/// A field that was present but could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Dotted path, e.g. `run_settings.env`
    pub field: String,
    /// Deserializer message
    pub message: String,
}

/// `auth` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSection {
    /// Account username
    pub username: Option<String>,
    /// Account access key
    pub access_key: Option<String>,
}

/// One browser entry of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BrowserSpec {
    /// Browser name, e.g. `chrome`
    pub browser: String,
    /// Operating system, e.g. `Windows 10`
    pub os: String,
    /// Browser versions, e.g. `latest`
    #[serde(default)]
    pub versions: Vec<String>,
}

/// `run_settings` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunSettings {
    /// Project root, relative to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
    /// Framework config, relative to the project dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_config_file: Option<PathBuf>,
    /// Build name shown on the dashboard
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    /// Requested parallels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallels: Option<ParallelsSetting>,
    /// Spec globs relative to the project dir
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<String>,
    /// Environment variables for the test run
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Globs left out of the archive
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Packages installed before the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,
    /// Seconds between status requests in synchronous mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

/// `connection_settings` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Route traffic through a local tunnel
    pub local: bool,
    /// Tunnel identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_identifier: Option<String>,
}

/// Parallels as written in the file: a number, text such as the `init`
/// placeholder, or anything else, which never validates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParallelsSetting {
    /// Integer value
    Count(i64),
    /// Text value
    Text(String),
    /// Fractions, booleans, lists and other unusable values
    Other(Value),
}

/// Accepted parallels: positive, or `-1` for the account maximum
pub const fn parallels_in_range(value: i64) -> bool {
    value >= -1 && value != 0
}

impl ParallelsSetting {
    /// The `init` placeholder text
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Text(text) if text == placeholders::PARALLELS)
    }

    /// Numeric value, parsing text when it holds a number
    pub fn count(&self) -> Option<i64> {
        match self {
            Self::Count(n) => Some(*n),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }

    /// Placeholder or an in-range number
    pub fn is_valid(&self) -> bool {
        self.is_placeholder() || self.count().is_some_and(parallels_in_range)
    }
}

/// Typed reads out of one JSON object, recording mistyped fields
struct Fields<'v, 'i> {
    map: Option<&'v Map<String, Value>>,
    prefix: &'static str,
    issues: &'i mut Vec<FieldIssue>,
}

impl<'v, 'i> Fields<'v, 'i> {
    fn new(
        map: Option<&'v Map<String, Value>>,
        prefix: &'static str,
        issues: &'i mut Vec<FieldIssue>,
    ) -> Self {
        Self { map, prefix, issues }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    fn record(&mut self, key: &str, message: String) {
        self.issues.push(FieldIssue {
            field: self.path(key),
            message,
        });
    }

    /// Value of `key`, or the default when absent or mistyped
    fn take<T: DeserializeOwned + Default>(&mut self, key: &str) -> T {
        let Some(value) = self.map.and_then(|map| map.get(key)) else {
            return T::default();
        };
        match T::deserialize(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.record(key, e.to_string());
                T::default()
            }
        }
    }

    /// Nested object under `key`; `null` counts as absent
    fn section(&mut self, key: &str) -> Option<&'v Map<String, Value>> {
        match self.map.and_then(|map| map.get(key)) {
            None | Some(Value::Null) => None,
            Some(Value::Object(section)) => Some(section),
            Some(other) => {
                self.record(key, format!("expected an object, found {other}"));
                None
            }
        }
    }
}

impl ConfigFile {
    /// Parse file contents, picking the format from the extension
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let parsed = if is_toml {
            toml::from_str::<toml::Value>(contents)
                .map_err(|e| e.to_string())
                .and_then(|value| serde_json::to_value(value).map_err(|e| e.to_string()))
        } else {
            serde_json::from_str::<Value>(contents).map_err(|e| e.to_string())
        };

        let value = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(Self::from_value(&value))
    }

    /// Read a parsed document field by field
    pub fn from_value(value: &Value) -> Self {
        let mut issues = Vec::new();
        let root = match value {
            Value::Object(map) => Some(map),
            other => {
                issues.push(FieldIssue {
                    field: "(root)".to_string(),
                    message: format!("expected an object, found {other}"),
                });
                None
            }
        };

        let mut top = Fields::new(root, "", &mut issues);
        let auth_map = top.section("auth");
        let run_settings_map = top.section("run_settings");
        let connection_map = top.section("connection_settings");
        let browsers = top.take("browsers");
        let disable_usage_reporting = top.take("disable_usage_reporting");

        let mut auth = Fields::new(auth_map, "auth", &mut issues);
        let auth = AuthSection {
            username: auth.take("username"),
            access_key: auth.take("access_key"),
        };

        let run_settings = run_settings_map.map(|map| {
            let mut fields = Fields::new(Some(map), "run_settings", &mut issues);
            RunSettings {
                project_dir: fields.take("project_dir"),
                framework_config_file: fields.take("framework_config_file"),
                build_name: fields.take("build_name"),
                parallels: fields.take("parallels"),
                specs: fields.take("specs"),
                env: fields.take("env"),
                exclude: fields.take("exclude"),
                dependencies: fields.take("dependencies"),
                poll_interval_secs: fields.take("poll_interval_secs"),
            }
        });

        let mut connection = Fields::new(connection_map, "connection_settings", &mut issues);
        let connection_settings = ConnectionSettings {
            local: connection.take("local"),
            local_identifier: connection.take("local_identifier"),
        };

        Self {
            auth,
            browsers,
            run_settings,
            connection_settings,
            disable_usage_reporting,
            invalid_fields: issues,
        }
    }

    /// Starter configuration written by `testship init`
    pub fn template() -> Self {
        Self {
            auth: AuthSection {
                username: Some(placeholders::USERNAME.to_string()),
                access_key: Some(placeholders::ACCESS_KEY.to_string()),
            },
            browsers: vec![BrowserSpec {
                browser: "chrome".to_string(),
                os: "Windows 10".to_string(),
                versions: vec!["latest".to_string(), "latest-1".to_string()],
            }],
            run_settings: Some(RunSettings {
                project_dir: Some(PathBuf::from(".")),
                build_name: Some("build-name".to_string()),
                parallels: Some(ParallelsSetting::Text(placeholders::PARALLELS.to_string())),
                dependencies: Some(BTreeMap::new()),
                ..RunSettings::default()
            }),
            connection_settings: ConnectionSettings::default(),
            disable_usage_reporting: false,
            invalid_fields: Vec::new(),
        }
    }
}
