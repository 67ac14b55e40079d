//! Error types for the run executor.

use crate::store::StoreError;
use quarry_query::QueryError;
use std::fmt;

/// Errors surfaced by the executor and through promise waits.
///
/// `RunCanceled` is the canonical sentinel observed when a run was
/// canceled through its promise; a run torn down by its execution context
/// reports `ContextCanceled` instead, so callers can tell the two apart
/// by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Task store lookup failed.
    Store(StoreError),
    /// The query service refused the submission.
    Query(QueryError),
    /// The run was canceled through its promise.
    RunCanceled,
    /// The execution context was canceled before the run finished.
    ContextCanceled,
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "task store error: {e}"),
            Self::Query(e) => write!(f, "query service error: {e}"),
            Self::RunCanceled => write!(f, "run canceled"),
            Self::ContextCanceled => write!(f, "execution context canceled"),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<StoreError> for ExecutorError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<QueryError> for ExecutorError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}
