//! Query service contracts.
//!
//! Two upstream shapes exist. The asynchronous shape returns a handle
//! immediately and the caller blocks on it; the blocking shape does not
//! return until results are materialized. The run executor programs
//! against [`QueryService`]; the blocking shape is lifted to it by
//! [`crate::blocking::BlockingServiceAdapter`].

use crate::error::QueryError;
use crate::request::QueryRequest;
use crate::results::{ResultSets, Statistics};
use async_trait::async_trait;

/// One in-flight query returned by [`QueryService::submit`].
///
/// Release is `Drop`: dropping the handle tells the engine the caller is
/// finished with it.
#[async_trait]
pub trait QueryExecution: Send {
    /// Resolves once the engine has finished with this query.
    ///
    /// Yields the named result sets on success, or `None` when the query
    /// terminated without delivering (failure or cancellation); consult
    /// [`err`](Self::err) afterwards to tell the two apart. One-shot:
    /// calls after a resolution return `None` immediately. Cancel-safe:
    /// dropping an unresolved `ready` future leaves the handle pollable
    /// again.
    async fn ready(&mut self) -> Option<ResultSets>;

    /// The error the engine observed, if any.
    ///
    /// Valid once [`ready`](Self::ready) has resolved.
    fn err(&self) -> Option<QueryError>;

    /// Engine statistics for the query.
    ///
    /// Valid once [`ready`](Self::ready) has resolved.
    fn statistics(&self) -> Statistics;

    /// Asks the engine to stop the query promptly.
    ///
    /// Idempotent. Causes [`ready`](Self::ready) to resolve.
    fn cancel(&self);
}

/// The asynchronous query service shape.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submits a query, returning quickly with a handle to block on.
    async fn submit(
        &self,
        request: QueryRequest,
    ) -> Result<Box<dyn QueryExecution>, QueryError>;
}
