//! Run promises: the caller-facing handle for one queued run.
//!
//! A promise leaves `pending` at most once. The outcome lives in a watch
//! channel latched by `send_if_modified`, which gives the single-transition
//! guarantee and the done broadcast in one primitive: every current and
//! future waiter observes the same terminal outcome.

use crate::error::ExecutorError;
use chrono::{DateTime, Utc};
use quarry_core::{RunId, TaskId};
use quarry_query::{QueryError, Statistics};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Inputs to one execution attempt of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRun {
    /// The task to run.
    pub task_id: TaskId,
    /// The run this attempt belongs to.
    pub run_id: RunId,
    /// Logical wall-clock for the script and the engine.
    pub now: DateTime<Utc>,
}

/// The terminal observation of a run that reached the engine.
///
/// A run that ran and failed still yields a `RunResult` describing the
/// failure; cancellations and infrastructure errors yield none (the wait
/// returns the error instead).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    err: Option<QueryError>,
    statistics: Statistics,
}

impl RunResult {
    /// Result for a run the engine completed successfully.
    #[must_use]
    pub fn succeeded(statistics: Statistics) -> Self {
        Self {
            err: None,
            statistics,
        }
    }

    /// Result for a run the engine reported as failed.
    #[must_use]
    pub fn failed(err: QueryError, statistics: Statistics) -> Self {
        Self {
            err: Some(err),
            statistics,
        }
    }

    /// The failure the engine reported, if any.
    #[must_use]
    pub fn error(&self) -> Option<&QueryError> {
        self.err.as_ref()
    }

    /// Engine statistics for the run.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }
}

/// What a wait observes once the run leaves `pending`.
pub type RunOutcome = Result<RunResult, ExecutorError>;

/// The live handle for one queued run.
///
/// Clones share state: any clone may wait or cancel, and every waiter
/// observes the same terminal outcome.
#[derive(Debug, Clone)]
pub struct RunPromise {
    queued: QueuedRun,
    shared: Arc<PromiseShared>,
}

#[derive(Debug)]
struct PromiseShared {
    cancel: CancellationToken,
    outcome: (
        watch::Sender<Option<RunOutcome>>,
        watch::Receiver<Option<RunOutcome>>,
    ),
}

impl RunPromise {
    /// Creates a pending promise for the queued run.
    #[must_use]
    pub(crate) fn new(queued: QueuedRun) -> Self {
        Self {
            queued,
            shared: Arc::new(PromiseShared {
                cancel: CancellationToken::new(),
                outcome: watch::channel(None),
            }),
        }
    }

    /// The queued run this promise tracks.
    #[must_use]
    pub fn run(&self) -> QueuedRun {
        self.queued
    }

    /// Blocks until the run reaches a terminal state and returns it.
    ///
    /// Safe for concurrent callers and for repeated calls on a terminated
    /// promise; every call observes the same outcome.
    pub async fn wait(&self) -> RunOutcome {
        let mut rx = self.shared.outcome.1.clone();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            // The sender half lives in the shared state, so it cannot drop
            // while this handle is alive.
            if rx.changed().await.is_err() {
                return Err(ExecutorError::RunCanceled);
            }
        }
    }

    /// Cancels the run.
    ///
    /// Idempotent, and a no-op on a terminated promise. A still-pending
    /// promise latches the canonical canceled outcome immediately; the
    /// worker observes the signal and tears down the in-flight query.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
        self.resolve(Err(ExecutorError::RunCanceled));
    }

    /// Token fired by [`cancel`](Self::cancel).
    pub(crate) fn cancel_signal(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Latches the outcome. Returns false if the promise already resolved.
    pub(crate) fn resolve(&self, outcome: RunOutcome) -> bool {
        self.shared.outcome.0.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use tokio::time::sleep;

    fn queued() -> QueuedRun {
        QueuedRun {
            task_id: TaskId::new(2),
            run_id: RunId::new(7),
            now: Utc.timestamp_opt(123, 0).unwrap(),
        }
    }

    #[test]
    fn run_returns_the_descriptor_verbatim() {
        let queued = queued();
        let promise = RunPromise::new(queued);
        assert_eq!(promise.run(), queued);
    }

    #[tokio::test]
    async fn wait_observes_resolution() {
        let promise = RunPromise::new(queued());
        assert!(promise.resolve(Ok(RunResult::succeeded(Statistics::default()))));

        let outcome = promise.wait().await;
        assert!(outcome.unwrap().error().is_none());
    }

    #[tokio::test]
    async fn outcome_transitions_at_most_once() {
        let promise = RunPromise::new(queued());
        assert!(promise.resolve(Ok(RunResult::succeeded(Statistics::default()))));
        assert!(!promise.resolve(Err(ExecutorError::RunCanceled)));

        assert!(promise.wait().await.is_ok());
    }

    #[tokio::test]
    async fn repeated_waits_observe_identical_outcomes() {
        let promise = RunPromise::new(queued());
        promise.resolve(Ok(RunResult::failed(
            QueryError::Evaluation {
                message: "boom".to_string(),
            },
            Statistics::default(),
        )));

        let first = promise.wait().await;
        let second = promise.wait().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cancel_latches_the_canonical_error() {
        let promise = RunPromise::new(queued());
        promise.cancel();
        promise.cancel();

        assert_eq!(promise.wait().await, Err(ExecutorError::RunCanceled));
        assert!(promise.cancel_signal().is_cancelled());
    }

    #[tokio::test]
    async fn cancel_after_resolution_is_a_no_op() {
        let promise = RunPromise::new(queued());
        promise.resolve(Ok(RunResult::succeeded(Statistics::default())));
        promise.cancel();

        assert!(promise.wait().await.is_ok());
    }

    #[tokio::test]
    async fn waiters_blocked_before_resolution_all_complete() {
        let promise = RunPromise::new(queued());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let promise = promise.clone();
                tokio::spawn(async move { promise.wait().await })
            })
            .collect();

        sleep(Duration::from_millis(10)).await;
        assert!(waiters.iter().all(|waiter| !waiter.is_finished()));

        promise.resolve(Ok(RunResult::succeeded(Statistics::default())));
        for waiter in waiters {
            let outcome = waiter.await.unwrap();
            assert_eq!(outcome, Ok(RunResult::succeeded(Statistics::default())));
        }
    }
}
