//! Idempotency guard over the task store's unique key.

use std::sync::Arc;

use carecall_core::traits::{CreateOutcome, TaskStore};
use carecall_core::{NewCareTask, Result, TaskKey};

/// Exists-check plus insert. The store's unique index is authoritative;
/// the pre-check only saves the calculation work on replays.
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn TaskStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn exists(&self, key: &TaskKey) -> Result<bool> {
        self.store.exists(key).await
    }

    /// Insert under the unique key. A concurrent winner yields `AlreadyExists`.
    pub async fn create(&self, task: NewCareTask) -> Result<CreateOutcome> {
        let key = task.key;
        let outcome = self.store.create(task).await?;
        if outcome == CreateOutcome::AlreadyExists {
            tracing::debug!("🔁 Lost insert race for {key}");
        }
        Ok(outcome)
    }
}
