//! Script compilation contract.
//!
//! Turning a task script into an executable specification is the query
//! language library's job; this module defines the seam plus the minimal
//! packaging compiler the platform ships.

use crate::error::QueryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A compiled query specification.
///
/// Opaque to the executor: the engine interprets the source against the
/// evaluation instant baked in at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// The script source the engine evaluates.
    pub source: String,
    /// The logical wall-clock the script observes as `now`.
    pub now: DateTime<Utc>,
}

/// Trait for compiling a task script into a specification.
#[async_trait]
pub trait ScriptCompiler: Send + Sync {
    /// Compiles the script against the given evaluation instant.
    async fn compile(&self, script: &str, now: DateTime<Utc>) -> Result<QuerySpec, QueryError>;
}

/// Compiler that packages the source verbatim.
///
/// Parsing and planning happen inside the engine; this compiler only
/// rejects scripts that cannot possibly evaluate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCompiler;

#[async_trait]
impl ScriptCompiler for SourceCompiler {
    async fn compile(&self, script: &str, now: DateTime<Utc>) -> Result<QuerySpec, QueryError> {
        if script.trim().is_empty() {
            return Err(QueryError::Compilation {
                message: "script is empty".to_string(),
            });
        }
        Ok(QuerySpec {
            source: script.to_string(),
            now,
        })
    }
}
