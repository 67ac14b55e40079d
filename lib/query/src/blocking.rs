//! Bridge from the blocking query service shape to the asynchronous one.
//!
//! Some engines only expose a call that does not return until results are
//! materialized. [`BlockingServiceAdapter`] lifts that shape behind
//! [`QueryService`]: `submit` spawns a bridging task that performs the
//! blocking call and fulfills a synthetic handle, so the caller still gets
//! a handle back promptly and blocks on it like any other query.

use crate::error::QueryError;
use crate::request::QueryRequest;
use crate::results::{QueryResults, ResultSets, Statistics};
use crate::service::{QueryExecution, QueryService};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// The blocking query service shape.
#[async_trait]
pub trait BlockingQueryService: Send + Sync {
    /// Evaluates the request to completion.
    ///
    /// Resolves only once results are materialized or the engine fails
    /// hard.
    async fn query(&self, request: QueryRequest) -> Result<QueryResults, QueryError>;
}

/// Adapter exposing a [`BlockingQueryService`] as a [`QueryService`].
#[derive(Debug)]
pub struct BlockingServiceAdapter<S> {
    inner: Arc<S>,
}

impl<S> BlockingServiceAdapter<S> {
    /// Wraps a blocking service.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl<S> Clone for BlockingServiceAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<S> QueryService for BlockingServiceAdapter<S>
where
    S: BlockingQueryService + 'static,
{
    async fn submit(
        &self,
        request: QueryRequest,
    ) -> Result<Box<dyn QueryExecution>, QueryError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let outcome = Arc::new(Mutex::new(BridgeOutcome::default()));
        let cancellation = CancellationToken::new();

        let service = Arc::clone(&self.inner);
        let bridge_outcome = Arc::clone(&outcome);
        let bridge_cancellation = cancellation.clone();
        tokio::spawn(async move {
            let results = tokio::select! {
                // Abandoning the engine call is the only way to honor a
                // cancel on this shape; the handle reports no delivery and
                // no error.
                _ = bridge_cancellation.cancelled() => return,
                results = service.query(request) => results,
            };
            match results {
                Ok(results) => {
                    bridge_outcome
                        .lock()
                        .expect("bridge outcome mutex poisoned")
                        .statistics = results.statistics;
                    // The receiver is gone if the caller dropped the handle;
                    // nothing left to deliver to.
                    let _ = ready_tx.send(results.sets);
                }
                Err(err) => {
                    bridge_outcome
                        .lock()
                        .expect("bridge outcome mutex poisoned")
                        .err = Some(err);
                    // Closing the channel without a delivery signals failure.
                }
            }
        });

        Ok(Box::new(BridgedExecution {
            ready: Some(ready_rx),
            outcome,
            cancellation,
        }))
    }
}

/// Terminal state shared between the bridging task and the handle.
#[derive(Debug, Default)]
struct BridgeOutcome {
    err: Option<QueryError>,
    statistics: Statistics,
}

/// Synthetic handle fulfilled by the bridging task.
struct BridgedExecution {
    ready: Option<oneshot::Receiver<ResultSets>>,
    outcome: Arc<Mutex<BridgeOutcome>>,
    cancellation: CancellationToken,
}

#[async_trait]
impl QueryExecution for BridgedExecution {
    async fn ready(&mut self) -> Option<ResultSets> {
        let rx = self.ready.as_mut()?;
        let delivered = rx.await.ok();
        self.ready = None;
        delivered
    }

    fn err(&self) -> Option<QueryError> {
        self.outcome
            .lock()
            .expect("bridge outcome mutex poisoned")
            .err
            .clone()
    }

    fn statistics(&self) -> Statistics {
        self.outcome
            .lock()
            .expect("bridge outcome mutex poisoned")
            .statistics
    }

    fn cancel(&self) {
        self.cancellation.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::QuerySpec;
    use crate::request::Authorization;
    use chrono::{TimeZone, Utc};
    use quarry_core::{OrgId, UserId};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    fn request() -> QueryRequest {
        QueryRequest {
            org: OrgId::new(0xa0),
            spec: QuerySpec {
                source: "from(bucket: \"one\")".to_string(),
                now: Utc.timestamp_opt(123, 0).unwrap(),
            },
            authorization: Authorization::for_user(UserId::new(0xb0)),
        }
    }

    /// Blocking service whose call parks until the test releases it.
    struct GatedService {
        release: Notify,
        response: Mutex<Option<Result<QueryResults, QueryError>>>,
    }

    impl GatedService {
        fn new(response: Result<QueryResults, QueryError>) -> Self {
            Self {
                release: Notify::new(),
                response: Mutex::new(Some(response)),
            }
        }
    }

    #[async_trait]
    impl BlockingQueryService for GatedService {
        async fn query(&self, _request: QueryRequest) -> Result<QueryResults, QueryError> {
            self.release.notified().await;
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("query called twice")
        }
    }

    #[tokio::test]
    async fn submit_returns_before_the_blocking_call_finishes() {
        let adapter = BlockingServiceAdapter::new(GatedService::new(Ok(QueryResults::default())));
        let service = Arc::clone(&adapter.inner);

        let mut handle = timeout(Duration::from_millis(100), adapter.submit(request()))
            .await
            .expect("submit blocked on the engine")
            .unwrap();

        service.release.notify_one();
        assert_eq!(handle.ready().await, Some(ResultSets::new()));
        assert_eq!(handle.err(), None);
    }

    #[tokio::test]
    async fn engine_error_surfaces_through_the_handle() {
        let adapter = BlockingServiceAdapter::new(GatedService::new(Err(QueryError::Evaluation {
            message: "boom".to_string(),
        })));
        let service = Arc::clone(&adapter.inner);

        let mut handle = adapter.submit(request()).await.unwrap();
        service.release.notify_one();

        assert_eq!(handle.ready().await, None);
        assert_eq!(
            handle.err(),
            Some(QueryError::Evaluation {
                message: "boom".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn statistics_propagate_from_the_blocking_call() {
        let statistics = Statistics {
            total_duration_ms: 5,
            scanned_values: 10,
            scanned_bytes: 80,
        };
        let adapter = BlockingServiceAdapter::new(GatedService::new(Ok(QueryResults {
            sets: ResultSets::new(),
            statistics,
        })));
        let service = Arc::clone(&adapter.inner);

        let mut handle = adapter.submit(request()).await.unwrap();
        service.release.notify_one();

        assert!(handle.ready().await.is_some());
        assert_eq!(handle.statistics(), statistics);
    }

    #[tokio::test]
    async fn cancel_closes_the_handle_promptly() {
        let adapter = BlockingServiceAdapter::new(GatedService::new(Ok(QueryResults::default())));

        let mut handle = adapter.submit(request()).await.unwrap();
        handle.cancel();

        let delivery = timeout(Duration::from_millis(100), handle.ready())
            .await
            .expect("ready did not resolve after cancel");
        assert_eq!(delivery, None);
        assert_eq!(handle.err(), None);
    }

    #[tokio::test]
    async fn ready_is_one_shot() {
        let adapter = BlockingServiceAdapter::new(GatedService::new(Ok(QueryResults::default())));
        let service = Arc::clone(&adapter.inner);

        let mut handle = adapter.submit(request()).await.unwrap();
        service.release.notify_one();

        assert!(handle.ready().await.is_some());
        assert_eq!(handle.ready().await, None);
    }
}
