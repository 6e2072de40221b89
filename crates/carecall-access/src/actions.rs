//! Staff actions on existing tasks.
//!
//! Every action loads the task and checks it is visible to the requester
//! before touching it. Removal is additionally limited to department-wide
//! roles.

use std::sync::Arc;

use carecall_core::traits::TaskStore;
use carecall_core::{CareError, CareTask, NoteEntry, Requester, Result, TaskDetail, TaskStatus};

use crate::ownership::OwnershipResolver;

pub struct TaskActions {
    store: Arc<dyn TaskStore>,
    resolver: Arc<OwnershipResolver>,
}

impl TaskActions {
    pub fn new(store: Arc<dyn TaskStore>, resolver: Arc<OwnershipResolver>) -> Self {
        Self { store, resolver }
    }

    async fn load_visible(&self, requester: &Requester, task_id: i64) -> Result<CareTask> {
        let task = self
            .store
            .find(task_id)
            .await?
            .ok_or_else(|| CareError::NotFound(format!("care task {task_id}")))?;
        if !self.resolver.can_see(requester, &task).await? {
            return Err(CareError::Forbidden(format!(
                "admin {} cannot access care task {task_id}",
                requester.id
            )));
        }
        Ok(task)
    }

    pub async fn get(&self, requester: &Requester, task_id: i64) -> Result<CareTask> {
        self.load_visible(requester, task_id).await
    }

    pub async fn set_status(&self, requester: &Requester, task_id: i64, status: TaskStatus) -> Result<CareTask> {
        let mut task = self.load_visible(requester, task_id).await?;
        if task.status == status {
            return Ok(task);
        }
        tracing::info!("✏️ Task {task_id}: {} → {status} by admin {}", task.status, requester.id);
        task.status = status;
        task.updated_at = carecall_core::now_millis();
        self.store.update(&task).await?;
        Ok(task)
    }

    pub async fn append_note(&self, requester: &Requester, task_id: i64, body: &str) -> Result<CareTask> {
        let body = body.trim();
        if body.is_empty() {
            return Err(CareError::validation("note body is empty"));
        }
        let mut task = self.load_visible(requester, task_id).await?;
        let now = carecall_core::now_millis();
        task.note_history.push(NoteEntry {
            author_id: requester.id,
            body: body.to_string(),
            created_at: now,
        });
        task.updated_at = now;
        self.store.update(&task).await?;
        Ok(task)
    }

    /// Replace the type-specific payload. The payload kind must match the task type.
    pub async fn update_detail(&self, requester: &Requester, task_id: i64, detail: TaskDetail) -> Result<CareTask> {
        let mut task = self.load_visible(requester, task_id).await?;
        if detail.task_type() != task.task_type {
            return Err(CareError::validation(format!(
                "{} detail does not fit a {} task",
                detail.task_type(),
                task.task_type
            )));
        }
        task.detail = detail;
        task.updated_at = carecall_core::now_millis();
        self.store.update(&task).await?;
        Ok(task)
    }

    /// Administrative removal, managers and deputies only.
    pub async fn remove(&self, requester: &Requester, task_id: i64) -> Result<()> {
        let task = self.load_visible(requester, task_id).await?;
        if !requester.role.is_department_wide() {
            return Err(CareError::Forbidden(format!(
                "{} may not remove care tasks",
                requester.role
            )));
        }
        self.store.remove(task.id).await?;
        tracing::info!("🗑️ Task {task_id} ({}) removed by admin {}", task.key(), requester.id);
        Ok(())
    }
}
