//! Project packaging
//!
//! Zips the project tree into a single artifact for upload. Only file
//! types a test run can use are packaged; dependency folders, VCS data and
//! previous results are always left out.

use crate::config::RunSettings;
use crate::error::{Error, Result};
use crate::types::ArchiveArtifact;
use async_trait::async_trait;
use glob::Pattern;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Extensions copied into the archive
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "js", "ts", "jsx", "tsx", "mjs", "cjs", "coffee", "json", "feature", "features", "txt", "csv",
    "tsv", "xml", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "zip", "npmrc",
];

/// Directory names never packaged
pub const DEFAULT_EXCLUDED_DIRS: &[&str] =
    &["node_modules", ".git", "log", "results", "testship_results"];

const GENERATED_PACKAGE_JSON: &str = "package.json";

/// Whether any component of `relative` is a default-excluded directory
pub fn is_default_excluded(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| DEFAULT_EXCLUDED_DIRS.contains(&name)),
        _ => false,
    })
}

/// Unique artifact location under `dir`
pub fn artifact_path(dir: &Path) -> PathBuf {
    dir.join(format!("testship-{}.zip", Uuid::new_v4()))
}

/// Packages a project and disposes of the result
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Zip `run_settings.project_dir` into `output`
    async fn create_archive(
        &self,
        run_settings: &RunSettings,
        output: &Path,
        exclude: &[String],
    ) -> Result<ArchiveArtifact>;

    /// Remove an artifact; a missing file is not an error
    async fn delete_artifact(&self, path: &Path) -> Result<()>;
}

/// Deflate zip writer
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    async fn create_archive(
        &self,
        run_settings: &RunSettings,
        output: &Path,
        exclude: &[String],
    ) -> Result<ArchiveArtifact> {
        let project_dir = run_settings
            .project_dir
            .clone()
            .ok_or_else(|| Error::Archive("project_dir is not set".to_string()))?;
        let dependencies = run_settings.dependencies.clone().unwrap_or_default();
        let exclude = exclude.to_vec();
        let output = output.to_path_buf();

        debug!(
            project_dir = %project_dir.display(),
            output = %output.display(),
            "creating archive"
        );

        tokio::task::spawn_blocking(move || {
            write_archive(&project_dir, &output, &exclude, &dependencies)
        })
        .await
        .map_err(|e| Error::Internal(format!("archive task failed: {e}")))?
    }

    async fn delete_artifact(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted artifact");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Cleanup {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn is_packaged(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    // Dotfiles such as `.npmrc` count their whole name as the extension
    let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext);
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}

/// Forward-slash entry name for a relative path
fn entry_name(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

fn write_archive(
    project_dir: &Path,
    output: &Path,
    exclude: &[String],
    dependencies: &BTreeMap<String, String>,
) -> Result<ArchiveArtifact> {
    if !project_dir.is_dir() {
        return Err(Error::Archive(format!(
            "{} is not a directory",
            project_dir.display()
        )));
    }

    let exclude = exclude
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let generate_package_json = !dependencies.is_empty();

    let file = File::create(output)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0usize;

    let walker = WalkDir::new(project_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(project_dir).unwrap_or(entry.path());
            !is_default_excluded(relative)
        });

    for entry in walker {
        let entry = entry.map_err(|e| Error::Archive(e.to_string()))?;
        if !entry.file_type().is_file() || !is_packaged(entry.path()) {
            continue;
        }
        // The artifact may be written inside the project
        if entry.path() == output {
            continue;
        }

        let relative = entry.path().strip_prefix(project_dir).unwrap_or(entry.path());
        if exclude.iter().any(|p| p.matches_path(relative)) {
            continue;
        }
        if generate_package_json && relative == Path::new(GENERATED_PACKAGE_JSON) {
            continue;
        }
        let Some(name) = entry_name(relative) else {
            debug!(path = %relative.display(), "skipping non UTF-8 path");
            continue;
        };

        writer.start_file(name, options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut writer)?;
        entries += 1;
    }

    if generate_package_json {
        let manifest = serde_json::json!({
            "name": "testship-project",
            "private": true,
            "devDependencies": dependencies,
        });
        writer.start_file(GENERATED_PACKAGE_JSON, options)?;
        writer.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
        entries += 1;
    }

    writer.finish()?;
    let size = std::fs::metadata(output)?.len();
    debug!(entries, size, "archive written");

    Ok(ArchiveArtifact {
        path: output.to_path_buf(),
        size,
    })
}
