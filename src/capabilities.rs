//! Capability validation
//!
//! Checks a resolved configuration against what the remote service
//! accepts, reads the project's framework config and discovers the spec
//! files to run.

use crate::archive::is_default_excluded;
use crate::config::{
    DEFAULT_FRAMEWORK_CONFIG, RunArgs, RunConfiguration, parallels_in_range,
};
use crate::error::{Error, Result, ValidationError};
use crate::messages::placeholders;
use crate::types::{FrameworkConfig, ProjectManifest};
use async_trait::async_trait;
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Spec folder used when the framework config names none
pub const DEFAULT_SPEC_DIR: &str = "tests";

/// Extensions picked up by the default spec patterns
pub const SPEC_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "mjs", "cjs", "feature"];

/// Validates configuration and resolves the project manifest
#[async_trait]
pub trait CapabilityValidator: Send + Sync {
    /// Validate `config` and produce the manifest (without spec files)
    async fn validate(&self, config: &RunConfiguration, args: &RunArgs)
    -> Result<ProjectManifest>;

    /// Spec files to run, relative to the project dir
    async fn discover_specs(
        &self,
        config: &RunConfiguration,
        args: &RunArgs,
        manifest: &ProjectManifest,
    ) -> Result<Vec<PathBuf>>;
}

/// Filesystem-backed validator
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectValidator;

#[async_trait]
impl CapabilityValidator for ProjectValidator {
    async fn validate(
        &self,
        config: &RunConfiguration,
        args: &RunArgs,
    ) -> Result<ProjectManifest> {
        check_static(config)?;

        let project_dir = config
            .run_settings
            .project_dir
            .clone()
            .ok_or(ValidationError::EmptyProjectDir)?;
        let is_dir = tokio::fs::metadata(&project_dir)
            .await
            .is_ok_and(|meta| meta.is_dir());
        if !is_dir {
            return Err(ValidationError::IncorrectDirectoryStructure.into());
        }

        let parallels = requested_parallels(config, args)?;

        let framework = read_framework_config(config, &project_dir).await?;
        if framework
            .base_url
            .as_deref()
            .is_some_and(is_local_url)
            && !config.local
        {
            return Err(ValidationError::LocalNotSet.into());
        }

        debug!(
            project_dir = %project_dir.display(),
            parallels = ?parallels,
            base_url = ?framework.base_url,
            "configuration validated"
        );

        Ok(ProjectManifest {
            project_dir,
            spec_files: Vec::new(),
            parallels,
            framework,
        })
    }

    async fn discover_specs(
        &self,
        config: &RunConfiguration,
        _args: &RunArgs,
        manifest: &ProjectManifest,
    ) -> Result<Vec<PathBuf>> {
        let patterns = if config.run_settings.specs.is_empty() {
            let spec_dir = manifest
                .framework
                .spec_dir
                .as_deref()
                .unwrap_or(DEFAULT_SPEC_DIR)
                .trim_end_matches('/');
            SPEC_EXTENSIONS
                .iter()
                .map(|ext| format!("{spec_dir}/**/*.{ext}"))
                .collect()
        } else {
            config.run_settings.specs.clone()
        };
        let excludes = config.run_settings.exclude.clone();
        let project_dir = manifest.project_dir.clone();

        let specs = tokio::task::spawn_blocking(move || {
            find_specs(&project_dir, &patterns, &excludes)
        })
        .await
        .map_err(|e| Error::Internal(format!("spec discovery task failed: {e}")))??;

        debug!(count = specs.len(), "discovered spec files");
        Ok(specs)
    }
}

/// Checks that need nothing but the configuration itself
fn check_static(config: &RunConfiguration) -> std::result::Result<(), ValidationError> {
    if config.is_blank() {
        return Err(ValidationError::EmptyConfig);
    }
    if let Some(issue) = config.invalid_fields.first() {
        return Err(ValidationError::InvalidField {
            field: issue.field.clone(),
            message: issue.message.clone(),
        });
    }

    let creds = &config.credentials;
    if creds.username.is_empty() || creds.access_key.is_empty() {
        return Err(ValidationError::MissingAuth);
    }
    if creds.username == placeholders::USERNAME || creds.access_key == placeholders::ACCESS_KEY {
        return Err(ValidationError::DefaultAuth);
    }

    if config.browsers.is_empty() {
        return Err(ValidationError::EmptyBrowserList);
    }
    if !config.run_settings_declared {
        return Err(ValidationError::EmptyRunSettings);
    }
    Ok(())
}

/// Range-check parallels and pick the effective request (CLI first)
fn requested_parallels(
    config: &RunConfiguration,
    args: &RunArgs,
) -> std::result::Result<Option<i64>, ValidationError> {
    if args.parallels.is_some_and(|cli| !parallels_in_range(cli)) {
        return Err(ValidationError::InvalidParallels);
    }

    let from_file = config.run_settings.parallels.as_ref();
    if from_file.is_some_and(|p| !p.is_valid()) {
        return Err(ValidationError::InvalidParallels);
    }

    Ok(args
        .parallels
        .or_else(|| from_file.and_then(crate::config::ParallelsSetting::count)))
}

async fn read_framework_config(
    config: &RunConfiguration,
    project_dir: &Path,
) -> Result<FrameworkConfig> {
    let relative = config
        .run_settings
        .framework_config_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FRAMEWORK_CONFIG));
    let path = if relative.is_absolute() {
        relative
    } else {
        project_dir.join(relative)
    };

    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !config.framework_config_explicit => {
            debug!(path = %path.display(), "no framework config, using defaults");
            return Ok(FrameworkConfig::default());
        }
        Err(e) => {
            return Err(ValidationError::InvalidFrameworkConfig {
                message: format!("{} could not be read: {e}.", path.display()),
            }
            .into());
        }
    };

    serde_json::from_str(&contents).map_err(|e| {
        ValidationError::InvalidFrameworkConfig {
            message: format!("{} is not valid JSON: {e}.", path.display()),
        }
        .into()
    })
}

/// Whether a base URL only resolves on the developer's machine
fn is_local_url(base_url: &str) -> bool {
    Url::parse(base_url).map_or_else(
        |_| base_url.contains("localhost"),
        |url| {
            matches!(
                url.host_str(),
                Some("localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]")
            )
        },
    )
}

/// Expand spec globs under `project_dir`, minus excluded paths
fn find_specs(project_dir: &Path, patterns: &[String], excludes: &[String]) -> Result<Vec<PathBuf>> {
    let excludes = excludes
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let root = project_dir
        .to_str()
        .ok_or_else(|| Error::InvalidArgument(format!("non UTF-8 path: {}", project_dir.display())))?;
    let root = Pattern::escape(root);

    let mut found = BTreeSet::new();
    for pattern in patterns {
        let full = format!("{}/{}", root.trim_end_matches('/'), pattern.trim_start_matches("./"));
        for path in glob::glob(&full)?.filter_map(std::result::Result::ok) {
            if !path.is_file() {
                continue;
            }
            let relative = path.strip_prefix(project_dir).unwrap_or(&path).to_path_buf();
            if is_default_excluded(&relative) || excludes.iter().any(|p| p.matches_path(&relative)) {
                continue;
            }
            found.insert(relative);
        }
    }
    Ok(found.into_iter().collect())
}

/// Outcome of matching requested parallels against the work available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelsPlan {
    /// Parallels to request, `None` for the remote default
    pub parallels: Option<i64>,
    /// Original request when it was capped
    pub capped_from: Option<i64>,
}

/// Cap requested parallels at one machine per spec per browser combination
///
/// `-1` (account maximum) is passed through untouched.
pub fn resolve_parallels(
    requested: Option<i64>,
    combinations: usize,
    spec_count: usize,
) -> ParallelsPlan {
    let Some(requested) = requested else {
        return ParallelsPlan {
            parallels: None,
            capped_from: None,
        };
    };

    let max = i64::try_from(combinations.saturating_mul(spec_count)).unwrap_or(i64::MAX);
    if requested != -1 && max > 0 && requested > max {
        ParallelsPlan {
            parallels: Some(max),
            capped_from: Some(requested),
        }
    } else {
        ParallelsPlan {
            parallels: Some(requested),
            capped_from: None,
        }
    }
}
