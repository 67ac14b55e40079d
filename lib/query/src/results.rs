//! Result-set and statistics types reported by the query engine.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Named result sets produced by one query.
pub type ResultSets = BTreeMap<String, ResultSet>;

/// A single named result set.
///
/// The run executor drains result sets only to discover errors; rows are
/// discarded at that layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Materialized rows.
    pub rows: Vec<JsonValue>,
}

/// Summary statistics reported by the engine for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Wall-clock spent evaluating, in milliseconds.
    #[serde(default)]
    pub total_duration_ms: u64,
    /// Number of values scanned.
    #[serde(default)]
    pub scanned_values: u64,
    /// Number of bytes scanned.
    #[serde(default)]
    pub scanned_bytes: u64,
}

/// Everything a blocking query call materializes before returning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    /// Named result sets.
    pub sets: ResultSets,
    /// Engine statistics for the call.
    pub statistics: Statistics,
}
