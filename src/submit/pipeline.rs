//! Run-submission pipeline
//!
//! Stages run in a fixed order, each one a transition from [`State`] to
//! the next state or to a [`StageFailure`]. A single driver loop applies
//! the transitions; only its two terminal arms talk to the usage reporter,
//! so every invocation is reported exactly once.

use crate::archive::{Archiver, artifact_path};
use crate::capabilities::{CapabilityValidator, resolve_parallels};
use crate::config::{ConfigResolver, RunArgs, RunConfiguration};
use crate::error::{Error, ErrorCode, ValidationError};
use crate::messages::{user, validation};
use crate::remote::{ArtifactUploader, BuildSubmitter};
use crate::submit::{ProgressCallback, ResultsFile, Stage, classify};
use crate::sync::SyncPoller;
use crate::types::{ArchiveArtifact, BuildRecord, Outcome, ProjectManifest, UploadHandle};
use crate::usage::UsageReporter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// External collaborators driven by the pipeline
#[derive(Clone)]
pub struct Collaborators {
    /// Loads the run configuration
    pub resolver: Arc<dyn ConfigResolver>,
    /// Validates configuration and discovers specs
    pub validator: Arc<dyn CapabilityValidator>,
    /// Packages the project
    pub archiver: Arc<dyn Archiver>,
    /// Uploads the artifact
    pub uploader: Arc<dyn ArtifactUploader>,
    /// Creates the remote build
    pub builder: Arc<dyn BuildSubmitter>,
    /// Waits for the build in synchronous mode
    pub poller: Arc<dyn SyncPoller>,
    /// Records the outcome
    pub reporter: Arc<dyn UsageReporter>,
    /// Receives operator-facing updates
    pub progress: Arc<dyn ProgressCallback>,
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Reported outcome
    pub outcome: Outcome,
    /// Created build, if the run got that far
    pub build: Option<BuildRecord>,
    /// Process exit code
    pub exit_code: i32,
}

/// Exit code when the collaborators could not be set up (EX_OSERR)
pub const SETUP_FAILURE_EXIT_CODE: i32 = 71;

/// Report a failure that happened before a pipeline could be built
///
/// No configuration exists yet, so the report carries only the CLI
/// arguments and the opt-out is decided by them and the environment.
pub async fn report_setup_failure(
    reporter: &dyn UsageReporter,
    progress: &dyn ProgressCallback,
    args: &RunArgs,
    error: Error,
) -> RunResult {
    debug!(error = %error, "setup failed");
    progress.on_error(&error).await;

    let outcome = Outcome::Failure {
        code: ErrorCode::UnclassifiedError,
        message: error.to_string(),
    };
    reporter.report(None, args, &outcome).await;

    RunResult {
        outcome,
        build: None,
        exit_code: SETUP_FAILURE_EXIT_CODE,
    }
}

/// What happens after a build was created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Exit straight away; the build keeps running remotely
    Detached,
    /// Poll until the build finishes and exit with its result
    AwaitTerminal,
}

impl Completion {
    /// Completion requested by `config`
    pub const fn for_config(config: &RunConfiguration) -> Self {
        if config.sync {
            Self::AwaitTerminal
        } else {
            Self::Detached
        }
    }
}

enum State {
    Start,
    ConfigValidated(RunConfiguration),
    CapabilitiesValidated {
        config: RunConfiguration,
        manifest: ProjectManifest,
    },
    ManifestResolved {
        config: RunConfiguration,
        manifest: ProjectManifest,
    },
    ParallelismSet {
        config: RunConfiguration,
        manifest: ProjectManifest,
    },
    Archived {
        config: RunConfiguration,
        artifact: ArchiveArtifact,
    },
    Uploaded {
        config: RunConfiguration,
        upload: UploadHandle,
    },
    BuildCreated {
        config: RunConfiguration,
        build: BuildRecord,
    },
}

/// A stage failed; carries what its handler needs
struct StageFailure {
    stage: Stage,
    error: Error,
    config: Option<RunConfiguration>,
    /// Local artifact to remove
    artifact: Option<PathBuf>,
}

impl StageFailure {
    const fn new(stage: Stage, error: Error, config: Option<RunConfiguration>) -> Self {
        Self {
            stage,
            error,
            config,
            artifact: None,
        }
    }

    fn removing(mut self, artifact: PathBuf) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

type Transition = std::result::Result<State, StageFailure>;

/// Sequences validation, packaging, upload and build creation
pub struct SubmissionPipeline {
    collaborators: Collaborators,
    artifact_dir: PathBuf,
    results: ResultsFile,
}

impl SubmissionPipeline {
    /// Create a pipeline writing artifacts under `artifact_dir`
    pub const fn new(
        collaborators: Collaborators,
        artifact_dir: PathBuf,
        results: ResultsFile,
    ) -> Self {
        Self {
            collaborators,
            artifact_dir,
            results,
        }
    }

    /// Run one submission
    pub async fn run(&self, args: &RunArgs) -> RunResult {
        if let Err(e) = self.results.clear().await {
            warn!(path = %self.results.path().display(), error = %e, "could not remove stale results");
        }

        let mut state = State::Start;
        loop {
            state = match state {
                State::BuildCreated { config, build } => {
                    return self.succeed(config, build, args).await;
                }
                other => match self.step(other, args).await {
                    Ok(next) => next,
                    Err(failure) => return self.fail(failure, args).await,
                },
            };
        }
    }

    async fn step(&self, state: State, args: &RunArgs) -> Transition {
        match state {
            State::Start => self.load_config(args).await,
            State::ConfigValidated(config) => self.validate(config, args).await,
            State::CapabilitiesValidated { config, manifest } => {
                self.resolve_manifest(config, manifest, args).await
            }
            State::ManifestResolved { config, manifest } => {
                Ok(self.set_parallelism(config, manifest).await)
            }
            State::ParallelismSet { config, manifest } => self.archive(config, &manifest).await,
            State::Archived { config, artifact } => self.upload(config, artifact).await,
            State::Uploaded { config, upload } => self.create_build(config, &upload).await,
            // Terminal; handled by the driver
            done @ State::BuildCreated { .. } => Ok(done),
        }
    }

    async fn load_config(&self, args: &RunArgs) -> Transition {
        self.progress().on_stage(Stage::LoadingConfig).await;
        self.collaborators
            .resolver
            .resolve(args)
            .await
            .map(State::ConfigValidated)
            .map_err(|e| StageFailure::new(Stage::LoadingConfig, e, None))
    }

    async fn validate(&self, config: RunConfiguration, args: &RunArgs) -> Transition {
        self.progress().on_stage(Stage::ValidatingCapabilities).await;
        match self.collaborators.validator.validate(&config, args).await {
            Ok(manifest) => Ok(State::CapabilitiesValidated { config, manifest }),
            Err(e) => Err(StageFailure::new(
                Stage::ValidatingCapabilities,
                e,
                Some(config),
            )),
        }
    }

    async fn resolve_manifest(
        &self,
        config: RunConfiguration,
        mut manifest: ProjectManifest,
        args: &RunArgs,
    ) -> Transition {
        self.progress().on_stage(Stage::ResolvingManifest).await;
        let specs = match self
            .collaborators
            .validator
            .discover_specs(&config, args, &manifest)
            .await
        {
            Ok(specs) if specs.is_empty() => Err(ValidationError::NoSpecFiles.into()),
            other => other,
        };

        match specs {
            Ok(specs) => {
                debug!(count = specs.len(), "manifest resolved");
                manifest.spec_files = specs;
                Ok(State::ManifestResolved { config, manifest })
            }
            Err(e) => Err(StageFailure::new(Stage::ResolvingManifest, e, Some(config))),
        }
    }

    async fn set_parallelism(&self, config: RunConfiguration, manifest: ProjectManifest) -> State {
        self.progress().on_stage(Stage::SettingParallelism).await;
        let combinations = config.browser_combinations();
        let spec_count = manifest.spec_files.len();
        let plan = resolve_parallels(manifest.parallels, combinations, spec_count);

        if let (Some(requested), Some(parallels)) = (plan.capped_from, plan.parallels) {
            self.progress()
                .on_warning(&format!(
                    "Using {parallels} machines instead of {requested} that you configured as there are {spec_count} specs to be run on {combinations} browser combinations."
                ))
                .await;
        }

        State::ParallelismSet {
            config: config.with_parallels(plan.parallels),
            manifest,
        }
    }

    async fn archive(&self, config: RunConfiguration, manifest: &ProjectManifest) -> Transition {
        self.progress().on_stage(Stage::Archiving).await;
        let output = artifact_path(&self.artifact_dir);
        debug!(specs = manifest.spec_files.len(), output = %output.display(), "archiving project");

        match self
            .collaborators
            .archiver
            .create_archive(&config.run_settings, &output, &config.run_settings.exclude)
            .await
        {
            Ok(artifact) => Ok(State::Archived { config, artifact }),
            Err(e) => Err(StageFailure::new(Stage::Archiving, e, Some(config)).removing(output)),
        }
    }

    async fn upload(&self, config: RunConfiguration, artifact: ArchiveArtifact) -> Transition {
        self.progress().on_stage(Stage::Uploading).await;
        match self
            .collaborators
            .uploader
            .upload(&config, &artifact.path)
            .await
        {
            Ok(upload) => {
                // Hand-off complete; the local copy is no longer needed
                if let Err(e) = self.collaborators.archiver.delete_artifact(&artifact.path).await {
                    warn!(path = %artifact.path.display(), error = %e, "could not delete uploaded artifact");
                    self.progress()
                        .on_warning(&format!("{}: {e}", user::ZIP_DELETE_FAILED))
                        .await;
                }
                Ok(State::Uploaded { config, upload })
            }
            Err(e) => {
                Err(StageFailure::new(Stage::Uploading, e, Some(config)).removing(artifact.path))
            }
        }
    }

    async fn create_build(&self, config: RunConfiguration, upload: &UploadHandle) -> Transition {
        self.progress().on_stage(Stage::CreatingBuild).await;
        match self.collaborators.builder.create_build(&config, upload).await {
            Ok(build) => Ok(State::BuildCreated { config, build }),
            Err(e) => Err(StageFailure::new(Stage::CreatingBuild, e, Some(config))),
        }
    }

    /// Success arm: record the build, advise, report, then complete
    async fn succeed(&self, config: RunConfiguration, build: BuildRecord, args: &RunArgs) -> RunResult {
        let message = format!(
            "{}! {} with build id: {}",
            build.message.trim_end_matches('!'),
            user::BUILD_CREATED,
            build.build_id
        );
        let dashboard_link = format!("{} {}", user::VISIT_DASHBOARD, build.dashboard_url);

        if let Err(e) = self.results.export(&build.build_id).await {
            warn!(path = %self.results.path().display(), error = %e, "could not export results");
            self.progress()
                .on_warning(&format!(
                    "Could not write {}: {e}",
                    self.results.path().display()
                ))
                .await;
        }

        self.advise(&config).await;
        self.progress().on_build_created(&build, &message).await;

        let completion = Completion::for_config(&config);
        if completion == Completion::Detached {
            self.progress()
                .on_message(&user::EXIT_SYNC_CLI_MESSAGE.replace("<build-id>", &build.build_id))
                .await;
        }

        let outcome = Outcome::Success {
            message,
            dashboard_link,
        };
        self.collaborators
            .reporter
            .report(Some(&config), args, &outcome)
            .await;

        let exit_code = match completion {
            Completion::Detached => 0,
            Completion::AwaitTerminal => {
                self.progress().on_stage(Stage::Polling).await;
                self.collaborators
                    .poller
                    .poll_until_terminal(&config, &build)
                    .await
                    .code()
            }
        };

        RunResult {
            outcome,
            build: Some(build),
            exit_code,
        }
    }

    /// Observational warnings after build creation
    async fn advise(&self, config: &RunConfiguration) {
        if config.parallels.is_none() {
            self.progress().on_warning(user::NO_PARALLELS).await;
        }

        let no_dependencies = config
            .run_settings
            .dependencies
            .as_ref()
            .is_some_and(std::collections::BTreeMap::is_empty);
        if config.dependency_warning && no_dependencies {
            self.progress().on_warning(user::NO_DEPENDENCIES).await;
            self.progress()
                .on_warning(user::NO_DEPENDENCIES_READ_MORE)
                .await;
        }
    }

    /// Failure arm: compensate, then report once
    async fn fail(&self, failure: StageFailure, args: &RunArgs) -> RunResult {
        let StageFailure {
            stage,
            error,
            config,
            artifact,
        } = failure;
        let code = classify(stage, &error);
        debug!(%stage, %code, error = %error, "stage failed");
        self.progress().on_error(&error).await;

        let message = match stage {
            Stage::ValidatingCapabilities | Stage::ResolvingManifest => {
                let explicit_parallels = args.parallels.is_some()
                    && matches!(error, Error::Validation(ValidationError::InvalidParallels));
                if !explicit_parallels {
                    self.progress().on_warning(validation::NOT_VALID).await;
                }
                format!("{error}\n{}", validation::NOT_VALID)
            }
            Stage::Archiving => {
                self.progress().on_message(user::FAILED_TO_ZIP).await;
                format!("{error}\n{}", user::FAILED_TO_ZIP)
            }
            Stage::Uploading => {
                self.progress().on_message(user::ZIP_UPLOAD_FAILED).await;
                format!("{error}\n{}", user::ZIP_UPLOAD_FAILED)
            }
            Stage::LoadingConfig
            | Stage::SettingParallelism
            | Stage::CreatingBuild
            | Stage::Polling => error.to_string(),
        };

        if let Some(path) = artifact {
            if let Err(e) = self.collaborators.archiver.delete_artifact(&path).await {
                warn!(path = %path.display(), error = %e, "could not delete artifact");
                self.progress()
                    .on_warning(&format!("{}: {e}", user::ZIP_DELETE_FAILED))
                    .await;
            }
        }

        let outcome = Outcome::Failure { code, message };
        self.collaborators
            .reporter
            .report(config.as_ref(), args, &outcome)
            .await;

        RunResult {
            outcome,
            build: None,
            exit_code: stage.exit_code(),
        }
    }

    fn progress(&self) -> &dyn ProgressCallback {
        self.collaborators.progress.as_ref()
    }
}
