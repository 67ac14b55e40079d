//! Task store contract and the in-memory development store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarry_core::{OrgId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// A stored task record.
///
/// Read-only from the executor's perspective; the store owns mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Owning organization.
    pub org: OrgId,
    /// Owning user; run authorization derives from this.
    pub owner: UserId,
    /// Script source evaluated on every run.
    pub script: String,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    /// Owning organization.
    pub org: OrgId,
    /// Owning user.
    pub owner: UserId,
    /// Script source.
    pub script: String,
}

/// Errors from task store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No task exists with the given ID.
    TaskNotFound { task_id: TaskId },
    /// The store could not serve the request.
    Unavailable { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskNotFound { task_id } => write!(f, "task not found: {task_id}"),
            Self::Unavailable { message } => write!(f, "task store unavailable: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for task persistence.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates a task and returns its ID.
    async fn create_task(&self, new_task: NewTask) -> Result<TaskId, StoreError>;

    /// Finds a task by ID.
    async fn find_task(&self, task_id: TaskId) -> Result<Task, StoreError>;
}

/// In-memory task store.
///
/// Backs development and tests; production deployments use the persistent
/// store service.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    next_id: u64,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, new_task: NewTask) -> Result<TaskId, StoreError> {
        let mut state = self.state.lock().expect("task store mutex poisoned");
        state.next_id += 1;
        let id = TaskId::new(state.next_id);
        let now = Utc::now();
        state.tasks.insert(
            id,
            Task {
                id,
                org: new_task.org,
                owner: new_task.owner,
                script: new_task.script,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find_task(&self, task_id: TaskId) -> Result<Task, StoreError> {
        let state = self.state.lock().expect("task store mutex poisoned");
        state
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(StoreError::TaskNotFound { task_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_find_roundtrip() {
        let store = InMemoryTaskStore::new();
        let task_id = store
            .create_task(NewTask {
                org: OrgId::new(1),
                owner: UserId::new(2),
                script: "from(bucket: \"one\")".to_string(),
            })
            .await
            .unwrap();

        let task = store.find_task(task_id).await.unwrap();
        assert_eq!(task.id, task_id);
        assert_eq!(task.org, OrgId::new(1));
        assert_eq!(task.owner, UserId::new(2));
        assert_eq!(task.script, "from(bucket: \"one\")");
    }

    #[tokio::test]
    async fn find_missing_task_errors() {
        let store = InMemoryTaskStore::new();
        let missing = TaskId::new(0x5eed);
        let err = store.find_task(missing).await.unwrap_err();
        assert_eq!(err, StoreError::TaskNotFound { task_id: missing });
    }

    #[tokio::test]
    async fn created_tasks_get_distinct_ids() {
        let store = InMemoryTaskStore::new();
        let new_task = NewTask {
            org: OrgId::new(1),
            owner: UserId::new(2),
            script: "x".to_string(),
        };
        let first = store.create_task(new_task.clone()).await.unwrap();
        let second = store.create_task(new_task).await.unwrap();
        assert_ne!(first, second);
    }
}
