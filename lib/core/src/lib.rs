//! Core domain types for the quarry platform.
//!
//! This crate provides the strongly-typed identifiers shared by the task
//! store, the query service layer, and the run executor.

pub mod id;

pub use id::{OrgId, ParseIdError, RunId, TaskId, UserId};
