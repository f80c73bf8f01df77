//! CLI command implementations

mod init;
mod progress;
mod run;
pub mod style;

pub use init::run_init;
pub use progress::CliProgress;
pub use run::run_submission;
