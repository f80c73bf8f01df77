//! Run command - submit the project and optionally wait for the build

use crate::cli::CliProgress;
use std::path::PathBuf;
use std::sync::Arc;
use testship::archive::ZipArchiver;
use testship::capabilities::ProjectValidator;
use testship::config::{Endpoints, EnvOverrides, FileConfigResolver, RunArgs};
use testship::remote::RemoteClient;
use testship::submit::{
    Collaborators, DEFAULT_RESULTS_FILE, ProgressCallback, ResultsFile, SubmissionPipeline,
    report_setup_failure,
};
use testship::sync::StatusPoller;
use testship::usage::HttpUsageReporter;
use tracing::debug;

/// Run the submission pipeline and return the process exit code
pub async fn run_submission(args: RunArgs) -> i32 {
    let env = EnvOverrides::from_env();
    let endpoints = Endpoints::from_overrides(&env);
    debug!(api = %endpoints.api, "using endpoints");

    let progress: Arc<dyn ProgressCallback> = Arc::new(CliProgress::new());
    let reporter = HttpUsageReporter::new(endpoints.usage.clone(), env.disable_usage_reporting);
    let remote = match RemoteClient::new(endpoints.clone()) {
        Ok(remote) => Arc::new(remote),
        Err(e) => {
            let result = report_setup_failure(&reporter, progress.as_ref(), &args, e).await;
            return result.exit_code;
        }
    };
    let poller = StatusPoller::new(remote.clone(), progress.clone()).with_interrupt_handling();

    let collaborators = Collaborators {
        resolver: Arc::new(FileConfigResolver::new(env)),
        validator: Arc::new(ProjectValidator),
        archiver: Arc::new(ZipArchiver),
        uploader: remote.clone(),
        builder: remote,
        poller: Arc::new(poller),
        reporter: Arc::new(reporter),
        progress,
    };

    let results = ResultsFile::new(PathBuf::from(DEFAULT_RESULTS_FILE), endpoints);
    let pipeline = SubmissionPipeline::new(collaborators, std::env::temp_dir(), results);

    let result = pipeline.run(&args).await;
    debug!(exit_code = result.exit_code, "run finished");
    result.exit_code
}
