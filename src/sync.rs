//! Synchronous completion tracking
//!
//! Polls a created build until it reaches a terminal status. The result
//! only decides the process exit code; the submission itself has already
//! been reported by the time polling starts.

use crate::config::RunConfiguration;
use crate::messages::user;
use crate::remote::BuildStatusSource;
use crate::submit::ProgressCallback;
use crate::types::{BuildRecord, BuildStatus, SyncExit};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Consecutive status-request failures tolerated before giving up
pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Waits for a build to finish
#[async_trait]
pub trait SyncPoller: Send + Sync {
    /// Poll `build` until terminal and map the result to an exit
    async fn poll_until_terminal(&self, config: &RunConfiguration, build: &BuildRecord)
    -> SyncExit;
}

/// Interval-based poller over a [`BuildStatusSource`]
pub struct StatusPoller {
    source: Arc<dyn BuildStatusSource>,
    progress: Arc<dyn ProgressCallback>,
    handle_interrupt: bool,
    max_consecutive_errors: u32,
}

impl StatusPoller {
    /// Create a poller that reports to `progress`
    pub fn new(source: Arc<dyn BuildStatusSource>, progress: Arc<dyn ProgressCallback>) -> Self {
        Self {
            source,
            progress,
            handle_interrupt: false,
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
        }
    }

    /// Stop polling on Ctrl-C
    #[must_use]
    pub const fn with_interrupt_handling(mut self) -> Self {
        self.handle_interrupt = true;
        self
    }

    async fn poll(&self, config: &RunConfiguration, build: &BuildRecord) -> SyncExit {
        let interval = config.poll_interval();
        let mut failures = 0;
        let mut last: Option<BuildStatus> = None;

        loop {
            match self.source.build_status(config, &build.build_id).await {
                Ok(status) => {
                    failures = 0;
                    if last != Some(status) {
                        self.progress.on_build_status(&build.build_id, status).await;
                        last = Some(status);
                    }
                    if let Some(exit) = status.terminal_exit() {
                        debug!(build_id = %build.build_id, %status, "build finished");
                        return exit;
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(build_id = %build.build_id, failures, error = %e, "status request failed");
                    if failures > self.max_consecutive_errors {
                        self.progress.on_error(&e).await;
                        return SyncExit::Errored;
                    }
                    self.progress
                        .on_warning(&format!(
                            "Could not fetch build status ({failures}/{}): {e}",
                            self.max_consecutive_errors
                        ))
                        .await;
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[async_trait]
impl SyncPoller for StatusPoller {
    async fn poll_until_terminal(
        &self,
        config: &RunConfiguration,
        build: &BuildRecord,
    ) -> SyncExit {
        let exit = if self.handle_interrupt {
            tokio::select! {
                exit = self.poll(config, build) => exit,
                _ = tokio::signal::ctrl_c() => {
                    self.progress.on_warning(user::POLL_INTERRUPTED).await;
                    SyncExit::Interrupted
                }
            }
        } else {
            self.poll(config, build).await
        };

        self.progress.on_sync_complete(exit).await;
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunSettings;
    use crate::error::{Error, Result};
    use crate::submit::NoopProgress;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted responses, repeating the last one
    struct ScriptedSource {
        responses: Mutex<VecDeque<Option<BuildStatus>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: &[Option<BuildStatus>]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BuildStatusSource for ScriptedSource {
        async fn build_status(&self, _config: &RunConfiguration, _id: &str) -> Result<BuildStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                *responses.front().unwrap()
            };
            next.ok_or_else(|| Error::Internal("connection reset".to_string()))
        }
    }

    fn config() -> RunConfiguration {
        RunConfiguration {
            run_settings: RunSettings {
                poll_interval_secs: Some(0),
                ..RunSettings::default()
            },
            ..RunConfiguration::default()
        }
    }

    fn build() -> BuildRecord {
        BuildRecord {
            build_id: "b-1".to_string(),
            message: "created".to_string(),
            dashboard_url: "https://app.testship.dev/builds/b-1".to_string(),
        }
    }

    async fn run(source: Arc<ScriptedSource>) -> SyncExit {
        StatusPoller::new(source, Arc::new(NoopProgress))
            .poll_until_terminal(&config(), &build())
            .await
    }

    #[tokio::test]
    async fn test_polls_until_passed() {
        let source = ScriptedSource::new(&[
            Some(BuildStatus::Queued),
            Some(BuildStatus::Running),
            Some(BuildStatus::Passed),
        ]);
        assert_eq!(run(source.clone()).await, SyncExit::Passed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_and_errored_builds() {
        let source = ScriptedSource::new(&[Some(BuildStatus::Failed)]);
        assert_eq!(run(source).await.code(), 1);

        let source = ScriptedSource::new(&[Some(BuildStatus::Timeout)]);
        assert_eq!(run(source).await.code(), 2);
    }

    #[tokio::test]
    async fn test_tolerates_transient_errors() {
        let source = ScriptedSource::new(&[
            None,
            None,
            Some(BuildStatus::Running),
            None,
            Some(BuildStatus::Passed),
        ]);
        assert_eq!(run(source).await, SyncExit::Passed);
    }

    #[tokio::test]
    async fn test_gives_up_after_repeated_errors() {
        let source = ScriptedSource::new(&[None]);
        assert_eq!(run(source.clone()).await, SyncExit::Errored);
        assert_eq!(
            source.calls.load(Ordering::SeqCst),
            MAX_CONSECUTIVE_ERRORS as usize + 1
        );
    }
}
