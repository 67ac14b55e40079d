//! Run executor for the quarry platform.
//!
//! This crate drives queued task runs to completion:
//!
//! - **Task Store**: contract for resolving task records, plus the
//!   in-memory store used in development
//! - **Run Promise**: the caller-facing handle for one run, with
//!   multi-waiter wait and idempotent cancel
//! - **Executor**: accepts queued runs, spawns one worker per run, and
//!   provides a wait-until-quiescent barrier for shutdown

pub mod error;
pub mod executor;
pub mod promise;
pub mod store;

pub use error::ExecutorError;
pub use executor::Executor;
pub use promise::{QueuedRun, RunOutcome, RunPromise, RunResult};
pub use store::{InMemoryTaskStore, NewTask, StoreError, Task, TaskStore};
