//! Run submission
//!
//! Drives a run through its stages:
//! 1. Configuration - load and merge settings
//! 2. Validation - check capabilities and discover specs
//! 3. Packaging - archive, upload and create the build
//! 4. Completion - detach, or wait for the build to finish

mod classify;
mod pipeline;
mod progress;
mod results;

pub use classify::classify;
pub use pipeline::{
    Collaborators, Completion, RunResult, SETUP_FAILURE_EXIT_CODE, SubmissionPipeline,
    report_setup_failure,
};
pub use progress::{NoopProgress, ProgressCallback, Stage};
pub use results::{DEFAULT_RESULTS_FILE, ResultsFile};
