//! Shared CLI progress callback

use crate::cli::style::{Stylize, check, cross, hyperlink, spinner_style};
use anstream::{eprintln, println};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::sync::Mutex;
use std::time::Duration;
use testship::error::Error;
use testship::messages::user;
use testship::submit::{ProgressCallback, Stage};
use testship::types::{BuildRecord, BuildStatus, SyncExit};

/// CLI progress callback that prints to the terminal
///
/// Stages are listed as they start; while a build is polled a spinner
/// shows its latest status.
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a progress printer
    pub const fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    /// Run `print` without tearing the spinner
    fn above_spinner(&self, print: impl FnOnce()) {
        match self.spinner.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(spinner) => spinner.suspend(print),
                None => print(),
            },
            Err(_) => print(),
        }
    }

    fn start_spinner(&self, message: String) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.spinner.lock() {
            *guard = Some(spinner);
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(spinner) = guard.take() {
                spinner.finish_and_clear();
            }
        }
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_stage(&self, stage: Stage) {
        if stage == Stage::Polling {
            self.start_spinner(format!("{stage}..."));
        } else {
            println!("{}", format!("{stage}...").muted());
        }
    }

    async fn on_message(&self, message: &str) {
        self.above_spinner(|| println!("{message}"));
    }

    async fn on_warning(&self, message: &str) {
        self.above_spinner(|| eprintln!("{} {message}", "warning:".caution()));
    }

    async fn on_error(&self, error: &Error) {
        self.above_spinner(|| eprintln!("{} {error}", cross()));
    }

    async fn on_build_created(&self, build: &BuildRecord, message: &str) {
        println!("{} {message}", check());
        println!("  {} {}", user::VISIT_DASHBOARD, hyperlink(&build.dashboard_url));
    }

    async fn on_build_status(&self, build_id: &str, status: BuildStatus) {
        if let Ok(guard) = self.spinner.lock() {
            if let Some(spinner) = guard.as_ref() {
                spinner.set_message(format!("Build {} is {status}", build_id.accent()));
            }
        }
    }

    async fn on_sync_complete(&self, exit: SyncExit) {
        self.stop_spinner();
        match exit {
            SyncExit::Passed => println!("{} {}", check(), user::BUILD_PASSED),
            SyncExit::Failed => eprintln!("{} {}", cross(), user::BUILD_FAILED),
            SyncExit::Errored => eprintln!("{} {}", cross(), user::BUILD_ERRORED),
            // The poller already explained the interruption
            SyncExit::Interrupted => {}
        }
    }
}
