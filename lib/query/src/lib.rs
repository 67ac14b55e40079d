//! Query service abstraction for the quarry platform.
//!
//! This crate provides the uniform facade the run executor drives:
//!
//! - **Requests**: org-scoped query requests with authorization derived
//!   from the task owner
//! - **Compilation**: the seam turning script source plus an evaluation
//!   instant into a specification
//! - **Service Shapes**: an asynchronous submit/handle shape and a
//!   blocking shape, bridged by an adapter so callers see one API
//! - **Results**: named result sets and engine statistics

pub mod blocking;
pub mod compile;
pub mod error;
pub mod request;
pub mod results;
pub mod service;

pub use blocking::{BlockingQueryService, BlockingServiceAdapter};
pub use compile::{QuerySpec, ScriptCompiler, SourceCompiler};
pub use error::QueryError;
pub use request::{Authorization, QueryRequest};
pub use results::{QueryResults, ResultSet, ResultSets, Statistics};
pub use service::{QueryExecution, QueryService};
