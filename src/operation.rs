//! Generic wait-until-terminal-state loop for provider operations.
//!
//! Mutating provider calls return an [`OperationHandle`]; the poller queries
//! the operation status endpoint for that handle's scope at a fixed interval
//! until the reported status equals the configured terminal value. Progress
//! reporting is purely observational and never affects control flow.

use snafu::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::PollerConfig;
use crate::emit;
use crate::error::{OperationError, OperationFailedSnafu, PollTimeoutSnafu, StatusRequestSnafu};
use crate::metrics::events::{OperationCompleted, OperationOutcome};
use crate::provider::{OperationHandle, OperationResult, OperationsApi};

/// Polls provider operations to completion.
///
/// The poller is shared by every component that awaits operations; it holds
/// no per-operation state.
#[derive(Clone)]
pub struct OperationPoller {
    api: Arc<dyn OperationsApi>,
    interval: Duration,
    terminal_status: String,
    max_wait: Option<Duration>,
}

impl OperationPoller {
    pub fn new(api: Arc<dyn OperationsApi>, config: &PollerConfig) -> Self {
        Self {
            api,
            interval: config.interval(),
            terminal_status: config.terminal_status.clone(),
            max_wait: config.max_wait(),
        }
    }

    /// Block until the operation reaches its terminal state.
    ///
    /// Consumes the handle: once a terminal result is returned, the
    /// operation is never polled again. Polls at least once even if the
    /// operation is already terminal.
    ///
    /// A terminal result carrying an error payload fails with
    /// [`OperationError::OperationFailed`]; that failure is not retryable at
    /// this layer. If a maximum wait is configured, exceeding it fails with
    /// [`OperationError::PollTimeout`] (a stricter contract than plain
    /// unbounded waiting; the default is unbounded).
    pub async fn await_operation(
        &self,
        handle: OperationHandle,
    ) -> Result<OperationResult, OperationError> {
        info!(operation = %handle.name, scope = ?handle.scope, "Waiting for operation to finish");

        let started = Instant::now();
        let mut polls: u64 = 0;

        loop {
            let result = self
                .api
                .get_operation(&handle.scope, &handle.name)
                .await
                .context(StatusRequestSnafu {
                    name: handle.name.clone(),
                })?;
            polls += 1;

            if result.status == self.terminal_status {
                info!(operation = %handle.name, polls, "done");

                if let Some(detail) = result.error {
                    emit!(OperationCompleted {
                        outcome: OperationOutcome::Failed,
                        polls,
                    });
                    return OperationFailedSnafu {
                        name: handle.name,
                        detail,
                    }
                    .fail();
                }

                emit!(OperationCompleted {
                    outcome: OperationOutcome::Succeeded,
                    polls,
                });
                return Ok(result);
            }

            debug!(operation = %handle.name, polls, "operation pending");

            if let Some(max_wait) = self.max_wait {
                if started.elapsed() >= max_wait {
                    emit!(OperationCompleted {
                        outcome: OperationOutcome::TimedOut,
                        polls,
                    });
                    return PollTimeoutSnafu {
                        name: handle.name,
                        waited_secs: started.elapsed().as_secs(),
                    }
                    .fail();
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::ProviderError;
    use crate::provider::{OperationErrorDetail, OperationErrorEntry, OperationScope};

    /// Operations API returning a scripted sequence of results and
    /// recording how often it was polled.
    struct ScriptedOperations {
        results: Mutex<VecDeque<OperationResult>>,
        polls: Mutex<u64>,
    }

    impl ScriptedOperations {
        fn new(results: Vec<OperationResult>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                polls: Mutex::new(0),
            }
        }

        fn poll_count(&self) -> u64 {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait]
    impl OperationsApi for ScriptedOperations {
        async fn get_operation(
            &self,
            _scope: &OperationScope,
            _name: &str,
        ) -> Result<OperationResult, ProviderError> {
            *self.polls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::new("scripted results exhausted"))
        }
    }

    fn pending() -> OperationResult {
        OperationResult {
            status: "PENDING".to_string(),
            error: None,
        }
    }

    fn done() -> OperationResult {
        OperationResult {
            status: "DONE".to_string(),
            error: None,
        }
    }

    fn poller(api: Arc<dyn OperationsApi>) -> OperationPoller {
        OperationPoller::new(api, &PollerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_polls_until_terminal() {
        let api = Arc::new(ScriptedOperations::new(vec![pending(), pending(), done()]));
        let result = poller(api.clone())
            .await_operation(OperationHandle::zonal("op-1", "zone-a"))
            .await
            .unwrap();

        assert_eq!(result.status, "DONE");
        assert_eq!(api.poll_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_polls_at_least_once_when_already_done() {
        let api = Arc::new(ScriptedOperations::new(vec![done()]));
        poller(api.clone())
            .await_operation(OperationHandle::global("op-2"))
            .await
            .unwrap();

        assert_eq!(api.poll_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_payload_carried_verbatim() {
        let detail = OperationErrorDetail {
            errors: vec![OperationErrorEntry {
                code: "QUOTA_EXCEEDED".to_string(),
                message: "CPUS quota exceeded".to_string(),
            }],
        };
        let api = Arc::new(ScriptedOperations::new(vec![
            pending(),
            OperationResult {
                status: "DONE".to_string(),
                error: Some(detail.clone()),
            },
        ]));

        let err = poller(api)
            .await_operation(OperationHandle::regional("op-3", "region-b"))
            .await
            .unwrap_err();

        match err {
            OperationError::OperationFailed { name, detail: got } => {
                assert_eq!(name, "op-3");
                assert_eq!(got, detail);
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_terminal_status() {
        let config = PollerConfig {
            terminal_status: "FINISHED".to_string(),
            ..PollerConfig::default()
        };
        let api = Arc::new(ScriptedOperations::new(vec![
            done(), // "DONE" is not terminal under this config
            OperationResult {
                status: "FINISHED".to_string(),
                error: None,
            },
        ]));

        let result = OperationPoller::new(api.clone(), &config)
            .await_operation(OperationHandle::global("op-4"))
            .await
            .unwrap();

        assert_eq!(result.status, "FINISHED");
        assert_eq!(api.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_times_out() {
        let config = PollerConfig {
            max_wait_secs: Some(3),
            ..PollerConfig::default()
        };
        // Never terminal; enough scripted results to outlast the max wait.
        let api = Arc::new(ScriptedOperations::new(vec![pending(); 10]));

        let err = OperationPoller::new(api, &config)
            .await_operation(OperationHandle::zonal("op-5", "zone-a"))
            .await
            .unwrap_err();

        assert!(matches!(err, OperationError::PollTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_request_failure_propagates() {
        // Empty script: the first poll errors.
        let api = Arc::new(ScriptedOperations::new(vec![]));
        let err = poller(api)
            .await_operation(OperationHandle::global("op-6"))
            .await
            .unwrap_err();

        assert!(matches!(err, OperationError::StatusRequest { .. }));
    }
}
