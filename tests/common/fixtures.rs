//! Shared fixtures and a pipeline harness wired to the fakes

#![allow(dead_code)]

use crate::common::fakes::*;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use testship::config::{BrowserSpec, Credentials, Endpoints, RunConfiguration, RunSettings};
use testship::submit::{Collaborators, ResultsFile, SubmissionPipeline};
use testship::types::{BuildRecord, FrameworkConfig, ProjectManifest, SyncExit};

pub const BUILD_ID: &str = "b-7f3a";
pub const DASHBOARD_URL: &str = "https://app.testship.dev/builds/b-7f3a";

/// Valid configuration with one browser combination
pub fn config() -> RunConfiguration {
    RunConfiguration {
        credentials: Credentials {
            username: "alice".to_string(),
            access_key: "key".to_string(),
        },
        browsers: vec![BrowserSpec {
            browser: "chrome".to_string(),
            os: "Windows 10".to_string(),
            versions: vec!["latest".to_string()],
        }],
        run_settings: RunSettings {
            project_dir: Some(PathBuf::from("/work/e2e")),
            build_name: Some("nightly".to_string()),
            exclude: vec!["fixtures/**".to_string()],
            ..RunSettings::default()
        },
        run_settings_declared: true,
        ..RunConfiguration::default()
    }
}

pub fn manifest(parallels: Option<i64>) -> ProjectManifest {
    ProjectManifest {
        project_dir: PathBuf::from("/work/e2e"),
        spec_files: Vec::new(),
        parallels,
        framework: FrameworkConfig::default(),
    }
}

/// `count` spec paths
pub fn specs(count: usize) -> Vec<PathBuf> {
    (1..=count)
        .map(|i| PathBuf::from(format!("tests/spec_{i}.js")))
        .collect()
}

pub fn build() -> BuildRecord {
    BuildRecord {
        build_id: BUILD_ID.to_string(),
        message: "Success".to_string(),
        dashboard_url: DASHBOARD_URL.to_string(),
    }
}

/// Pipeline wired to fakes that all succeed; swap fields before `pipeline()`
pub struct Harness {
    pub log: EventLog,
    pub resolver: Arc<FakeResolver>,
    pub validator: Arc<FakeValidator>,
    pub archiver: Arc<FakeArchiver>,
    pub uploader: Arc<FakeUploader>,
    pub builder: Arc<FakeBuilder>,
    pub poller: Arc<FakePoller>,
    pub reporter: Arc<RecordingReporter>,
    pub progress: Arc<RecordingProgress>,
    pub workdir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: RunConfiguration) -> Self {
        let log = EventLog::default();
        Self {
            resolver: Arc::new(FakeResolver::returning(&log, config)),
            validator: Arc::new(FakeValidator::returning(&log, manifest(Some(2)), specs(3))),
            archiver: Arc::new(FakeArchiver::new(&log)),
            uploader: Arc::new(FakeUploader::returning(&log, "https://storage/zip-1")),
            builder: Arc::new(FakeBuilder::returning(&log, build())),
            poller: Arc::new(FakePoller::new(&log, SyncExit::Passed)),
            reporter: Arc::new(RecordingReporter::new(&log)),
            progress: Arc::new(RecordingProgress::default()),
            workdir: TempDir::new().unwrap(),
            log,
        }
    }

    pub fn results_path(&self) -> PathBuf {
        self.workdir.path().join("log/build_results.txt")
    }

    /// The fakes as pipeline collaborators
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            resolver: self.resolver.clone(),
            validator: self.validator.clone(),
            archiver: self.archiver.clone(),
            uploader: self.uploader.clone(),
            builder: self.builder.clone(),
            poller: self.poller.clone(),
            reporter: self.reporter.clone(),
            progress: self.progress.clone(),
        }
    }

    pub fn pipeline(&self) -> SubmissionPipeline {
        self.pipeline_from(self.collaborators())
    }

    /// Pipeline over `collaborators`, writing into this harness's workdir
    pub fn pipeline_from(&self, collaborators: Collaborators) -> SubmissionPipeline {
        SubmissionPipeline::new(
            collaborators,
            self.workdir.path().to_path_buf(),
            ResultsFile::new(self.results_path(), Endpoints::default()),
        )
    }
}
