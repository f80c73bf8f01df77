//! In-memory collaborators that count calls and log their order

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use testship::archive::Archiver;
use testship::capabilities::CapabilityValidator;
use testship::config::{ConfigResolver, RunArgs, RunConfiguration, RunSettings};
use testship::error::{Error, ErrorCode, Result};
use testship::remote::{ArtifactUploader, BuildSubmitter};
use testship::submit::{ProgressCallback, Stage};
use testship::sync::SyncPoller;
use testship::types::{
    ArchiveArtifact, BuildRecord, BuildStatus, Outcome, OutcomeKind, ProjectManifest, SyncExit,
    UploadHandle,
};
use testship::usage::UsageReporter;

type Respond<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// Ordered record of collaborator calls shared by all fakes
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<&'static str>>>);

impl EventLog {
    pub fn push(&self, event: &'static str) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| *e == event)
    }
}

pub struct FakeResolver {
    log: EventLog,
    respond: Respond<RunConfiguration>,
}

impl FakeResolver {
    pub fn returning(log: &EventLog, config: RunConfiguration) -> Self {
        Self {
            log: log.clone(),
            respond: Box::new(move || Ok(config.clone())),
        }
    }

    pub fn failing(log: &EventLog, error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            log: log.clone(),
            respond: Box::new(move || Err(error())),
        }
    }
}

#[async_trait]
impl ConfigResolver for FakeResolver {
    async fn resolve(&self, _args: &RunArgs) -> Result<RunConfiguration> {
        self.log.push("resolve");
        (self.respond)()
    }
}

pub struct FakeValidator {
    log: EventLog,
    manifest: Respond<ProjectManifest>,
    specs: Respond<Vec<PathBuf>>,
}

impl FakeValidator {
    pub fn returning(log: &EventLog, manifest: ProjectManifest, specs: Vec<PathBuf>) -> Self {
        Self {
            log: log.clone(),
            manifest: Box::new(move || Ok(manifest.clone())),
            specs: Box::new(move || Ok(specs.clone())),
        }
    }

    pub fn failing(log: &EventLog, error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            log: log.clone(),
            manifest: Box::new(move || Err(error())),
            specs: Box::new(|| Ok(Vec::new())),
        }
    }
}

#[async_trait]
impl CapabilityValidator for FakeValidator {
    async fn validate(
        &self,
        _config: &RunConfiguration,
        _args: &RunArgs,
    ) -> Result<ProjectManifest> {
        self.log.push("validate");
        (self.manifest)()
    }

    async fn discover_specs(
        &self,
        _config: &RunConfiguration,
        _args: &RunArgs,
        _manifest: &ProjectManifest,
    ) -> Result<Vec<PathBuf>> {
        self.log.push("discover");
        (self.specs)()
    }
}

pub struct FakeArchiver {
    log: EventLog,
    create_error: Option<Box<dyn Fn() -> Error + Send + Sync>>,
    delete_fails: bool,
    pub created: Mutex<Vec<PathBuf>>,
    pub deleted: Mutex<Vec<PathBuf>>,
    pub exclude_seen: Mutex<Vec<String>>,
}

impl FakeArchiver {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            create_error: None,
            delete_fails: false,
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            exclude_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.create_error = Some(Box::new(error));
        self
    }

    pub fn with_failing_delete(mut self) -> Self {
        self.delete_fails = true;
        self
    }

    pub fn deletions(&self) -> Vec<PathBuf> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Archiver for FakeArchiver {
    async fn create_archive(
        &self,
        _run_settings: &RunSettings,
        output: &Path,
        exclude: &[String],
    ) -> Result<ArchiveArtifact> {
        self.log.push("archive");
        self.created.lock().unwrap().push(output.to_path_buf());
        self.exclude_seen.lock().unwrap().extend(exclude.iter().cloned());
        if let Some(error) = &self.create_error {
            return Err(error());
        }
        Ok(ArchiveArtifact {
            path: output.to_path_buf(),
            size: 1024,
        })
    }

    async fn delete_artifact(&self, path: &Path) -> Result<()> {
        self.log.push("delete");
        self.deleted.lock().unwrap().push(path.to_path_buf());
        if self.delete_fails {
            return Err(Error::Cleanup {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }
}

pub struct FakeUploader {
    log: EventLog,
    respond: Respond<UploadHandle>,
}

impl FakeUploader {
    pub fn returning(log: &EventLog, url: &str) -> Self {
        let url = url.to_string();
        Self {
            log: log.clone(),
            respond: Box::new(move || Ok(UploadHandle { url: url.clone() })),
        }
    }

    pub fn failing(log: &EventLog, error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            log: log.clone(),
            respond: Box::new(move || Err(error())),
        }
    }
}

#[async_trait]
impl ArtifactUploader for FakeUploader {
    async fn upload(&self, _config: &RunConfiguration, _artifact: &Path) -> Result<UploadHandle> {
        self.log.push("upload");
        (self.respond)()
    }
}

pub struct FakeBuilder {
    log: EventLog,
    respond: Respond<BuildRecord>,
    pub parallels_seen: Mutex<Vec<Option<i64>>>,
}

impl FakeBuilder {
    pub fn returning(log: &EventLog, build: BuildRecord) -> Self {
        Self {
            log: log.clone(),
            respond: Box::new(move || Ok(build.clone())),
            parallels_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(log: &EventLog, error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            log: log.clone(),
            respond: Box::new(move || Err(error())),
            parallels_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BuildSubmitter for FakeBuilder {
    async fn create_build(
        &self,
        config: &RunConfiguration,
        _upload: &UploadHandle,
    ) -> Result<BuildRecord> {
        self.log.push("build");
        self.parallels_seen.lock().unwrap().push(config.parallels);
        (self.respond)()
    }
}

pub struct FakePoller {
    log: EventLog,
    exit: SyncExit,
    pub calls: AtomicUsize,
}

impl FakePoller {
    pub fn new(log: &EventLog, exit: SyncExit) -> Self {
        Self {
            log: log.clone(),
            exit,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncPoller for FakePoller {
    async fn poll_until_terminal(
        &self,
        _config: &RunConfiguration,
        _build: &BuildRecord,
    ) -> SyncExit {
        self.log.push("poll");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.exit
    }
}

/// One recorded usage report
#[derive(Debug, Clone)]
pub struct RecordedReport {
    pub had_config: bool,
    pub kind: OutcomeKind,
    pub code: Option<ErrorCode>,
    pub message: String,
}

pub struct RecordingReporter {
    log: EventLog,
    pub reports: Mutex<Vec<RecordedReport>>,
}

impl RecordingReporter {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn reports(&self) -> Vec<RecordedReport> {
        self.reports.lock().unwrap().clone()
    }

    /// The single report; panics if there were zero or several
    pub fn only(&self) -> RecordedReport {
        let reports = self.reports();
        assert_eq!(reports.len(), 1, "expected exactly one report: {reports:?}");
        reports.into_iter().next().unwrap()
    }
}

#[async_trait]
impl UsageReporter for RecordingReporter {
    async fn report(&self, config: Option<&RunConfiguration>, _args: &RunArgs, outcome: &Outcome) {
        self.log.push("report");
        self.reports.lock().unwrap().push(RecordedReport {
            had_config: config.is_some(),
            kind: outcome.kind(),
            code: outcome.code(),
            message: outcome.report_message(),
        });
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub stages: Mutex<Vec<Stage>>,
    pub messages: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub builds: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().clone()
    }

    pub fn has_warning(&self, text: &str) -> bool {
        self.warnings().iter().any(|w| w.contains(text))
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    async fn on_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    async fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    async fn on_build_created(&self, _build: &BuildRecord, message: &str) {
        self.builds.lock().unwrap().push(message.to_string());
    }

    async fn on_build_status(&self, _build_id: &str, _status: BuildStatus) {}

    async fn on_sync_complete(&self, _exit: SyncExit) {}
}
