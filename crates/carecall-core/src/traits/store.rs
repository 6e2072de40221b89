//! Care task persistence contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{Page, TaskQuery};
use crate::model::{CareTask, NewCareTask, TaskKey, TaskStatus};

/// Result of an insert guarded by the unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(CareTask),
    /// Another writer already holds the key; nothing was written.
    AlreadyExists,
}

/// Storage for care tasks.
///
/// Implementations must enforce uniqueness of
/// `(student_id, enrollment_id, task_type, lesson_index)` and report a
/// violation as [`CreateOutcome::AlreadyExists`], never as an error.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Point lookup on the unique key.
    async fn exists(&self, key: &TaskKey) -> Result<bool>;

    async fn create(&self, task: NewCareTask) -> Result<CreateOutcome>;

    async fn find(&self, id: i64) -> Result<Option<CareTask>>;

    async fn find_by_key(&self, key: &TaskKey) -> Result<Option<CareTask>>;

    /// Persist mutable fields; the key and `created_at` never change.
    async fn update(&self, task: &CareTask) -> Result<()>;

    /// Administrative removal. Returns whether a row was deleted.
    async fn remove(&self, id: i64) -> Result<bool>;

    /// One page plus the total for the same filter, read consistently.
    async fn query(&self, query: &TaskQuery) -> Result<Page<CareTask>>;

    /// Every task currently in `status`, oldest first.
    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<CareTask>>;
}
