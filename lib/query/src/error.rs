//! Error types for the query service layer.

use std::fmt;

/// Errors surfaced by the query service layer.
///
/// These carry only information available at the query layer; run-level
/// context (task, run) is added by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The script could not be compiled into a specification.
    Compilation { message: String },
    /// The service refused the request before the query started.
    ServiceUnavailable { message: String },
    /// The query ran and the engine reported a failure.
    Evaluation { message: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compilation { message } => write!(f, "compilation failed: {message}"),
            Self::ServiceUnavailable { message } => {
                write!(f, "query service unavailable: {message}")
            }
            Self::Evaluation { message } => write!(f, "query evaluation failed: {message}"),
        }
    }
}

impl std::error::Error for QueryError {}
