//! Build results file
//!
//! Records the created build for out-of-band inspection. The file is
//! removed at the start of every run, so its absence means the run never
//! reached build creation.

use crate::config::Endpoints;
use crate::error::Result;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Results file location relative to the working directory
pub const DEFAULT_RESULTS_FILE: &str = "log/build_results.txt";

/// `BUILD_ID` / `BUILD_URL` results file
#[derive(Debug, Clone)]
pub struct ResultsFile {
    path: PathBuf,
    endpoints: Endpoints,
}

impl ResultsFile {
    /// Results file at `path`, linking builds under `endpoints.dashboard`
    pub const fn new(path: PathBuf, endpoints: Endpoints) -> Self {
        Self { path, endpoints }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove results left by a previous run
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed stale results");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Record `build_id`
    pub async fn export(&self, build_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = format!(
            "BUILD_ID={build_id}\nBUILD_URL={}\n",
            self.endpoints.build_dashboard_url(build_id)
        );
        tokio::fs::write(&self.path, contents).await?;
        debug!(path = %self.path.display(), build_id, "exported results");
        Ok(())
    }
}
