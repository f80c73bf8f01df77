//! File-backed configuration resolver

use crate::config::{
    ConfigFile, ConfigResolver, Credentials, EnvOverrides, RunArgs, RunConfiguration,
};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads the config file and layers CLI and environment overrides on top
///
/// Precedence: CLI flag > environment > file > default.
#[derive(Debug, Clone, Default)]
pub struct FileConfigResolver {
    env: EnvOverrides,
}

impl FileConfigResolver {
    /// Create a resolver over a captured environment
    pub const fn new(env: EnvOverrides) -> Self {
        Self { env }
    }

    /// Merge a parsed file with the overrides
    pub fn merge(&self, path: &Path, file: ConfigFile, args: &RunArgs) -> RunConfiguration {
        let base_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let usage_reporting = !(file.disable_usage_reporting
            || args.disable_usage_reporting
            || self.env.disable_usage_reporting);

        let credentials = Credentials {
            username: args
                .username
                .clone()
                .or_else(|| self.env.username.clone())
                .or(file.auth.username)
                .unwrap_or_default(),
            access_key: args
                .access_key
                .clone()
                .or_else(|| self.env.access_key.clone())
                .or(file.auth.access_key)
                .unwrap_or_default(),
        };

        let run_settings_declared = file.run_settings.is_some();
        let mut run_settings = file.run_settings.unwrap_or_default();

        if let Some(name) = &args.build_name {
            run_settings.build_name = Some(name.clone());
        }

        let framework_config_explicit =
            args.framework_config.is_some() || run_settings.framework_config_file.is_some();
        if let Some(framework_config) = &args.framework_config {
            run_settings.framework_config_file = Some(framework_config.clone());
        }

        if !args.specs.is_empty() {
            run_settings.specs.clone_from(&args.specs);
        }
        run_settings
            .env
            .extend(args.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        run_settings.exclude.extend(args.exclude.iter().cloned());

        run_settings.project_dir = run_settings.project_dir.map(|dir| {
            let joined = if dir.is_absolute() {
                dir
            } else {
                base_dir.join(dir)
            };
            std::path::absolute(&joined).unwrap_or(joined)
        });

        let local = self.env.local.unwrap_or(file.connection_settings.local);
        let local_identifier = self
            .env
            .local_identifier
            .clone()
            .or(file.connection_settings.local_identifier);

        debug!(
            path = %path.display(),
            build_name = ?run_settings.build_name,
            local,
            usage_reporting,
            "resolved run configuration"
        );

        RunConfiguration {
            config_path: path.to_path_buf(),
            credentials,
            browsers: file.browsers,
            run_settings,
            run_settings_declared,
            framework_config_explicit,
            local,
            local_identifier,
            usage_reporting,
            dependency_warning: !args.disable_dependency_warning,
            sync: args.sync,
            parallels: None,
            invalid_fields: file.invalid_fields,
        }
    }
}

#[async_trait]
impl ConfigResolver for FileConfigResolver {
    async fn resolve(&self, args: &RunArgs) -> Result<RunConfiguration> {
        let path = args.config_file.as_path();
        debug!(path = %path.display(), "loading run configuration");

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::from_io(path, e))?;
        let file = ConfigFile::parse(path, &contents)?;

        Ok(self.merge(path, file, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorCode};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
        "auth": { "username": "file-user", "access_key": "file-key" },
        "browsers": [{ "browser": "chrome", "os": "Windows 10", "versions": ["latest"] }],
        "run_settings": {
            "project_dir": "e2e",
            "build_name": "from-file",
            "env": { "STAGE": "qa", "REGION": "eu" },
            "exclude": ["fixtures/**"]
        },
        "connection_settings": { "local": false, "local_identifier": "file-tunnel" }
    }"#;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("testship.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_cli_beats_env_beats_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, CONFIG);

        let env = EnvOverrides {
            username: Some("env-user".to_string()),
            access_key: Some("env-key".to_string()),
            ..EnvOverrides::default()
        };
        let args = RunArgs {
            config_file: path,
            username: Some("cli-user".to_string()),
            build_name: Some("from-cli".to_string()),
            ..RunArgs::default()
        };

        let config = FileConfigResolver::new(env).resolve(&args).await.unwrap();
        assert_eq!(config.credentials.username, "cli-user");
        assert_eq!(config.credentials.access_key, "env-key");
        assert_eq!(config.build_name(), Some("from-cli"));
    }

    #[tokio::test]
    async fn test_overrides_merge_into_run_settings() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, CONFIG);

        let args = RunArgs {
            config_file: path,
            specs: vec!["tests/login/*.js".to_string()],
            env: BTreeMap::from([("STAGE".to_string(), "prod".to_string())]),
            exclude: vec!["*.log".to_string()],
            sync: true,
            disable_dependency_warning: true,
            ..RunArgs::default()
        };

        let config = FileConfigResolver::default().resolve(&args).await.unwrap();
        assert_eq!(config.run_settings.specs, vec!["tests/login/*.js"]);
        assert_eq!(config.run_settings.env["STAGE"], "prod");
        assert_eq!(config.run_settings.env["REGION"], "eu");
        assert_eq!(config.run_settings.exclude, vec!["fixtures/**", "*.log"]);
        assert!(config.sync);
        assert!(!config.dependency_warning);
        assert!(config.run_settings_declared);
        assert!(!config.framework_config_explicit);
    }

    #[tokio::test]
    async fn test_project_dir_relative_to_config_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, CONFIG);

        let args = RunArgs {
            config_file: path,
            ..RunArgs::default()
        };
        let config = FileConfigResolver::default().resolve(&args).await.unwrap();
        let project_dir = config.run_settings.project_dir.unwrap();
        assert!(project_dir.is_absolute());
        assert!(project_dir.ends_with("e2e"));
        assert!(project_dir.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_env_controls_local_and_usage() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, CONFIG);

        let env = EnvOverrides {
            local: Some(true),
            local_identifier: Some("env-tunnel".to_string()),
            disable_usage_reporting: true,
            ..EnvOverrides::default()
        };
        let args = RunArgs {
            config_file: path,
            ..RunArgs::default()
        };
        let config = FileConfigResolver::new(env).resolve(&args).await.unwrap();
        assert!(config.local);
        assert_eq!(config.local_identifier.as_deref(), Some("env-tunnel"));
        assert!(!config.usage_reporting);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            config_file: dir.path().join("nope.json"),
            ..RunArgs::default()
        };
        let err = FileConfigResolver::default().resolve(&args).await.unwrap_err();
        match err {
            Error::Config(config_err) => assert_eq!(config_err.code(), ErrorCode::ConfigNotFound),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ \"auth\": ");
        let args = RunArgs {
            config_file: path,
            ..RunArgs::default()
        };
        let err = FileConfigResolver::default().resolve(&args).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse { .. })));
    }
}
