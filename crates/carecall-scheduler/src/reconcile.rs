//! Reconciliation of tasks parked in `waiting_next_booking`.
//! Uses tokio::interval, sleeps between passes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use carecall_core::traits::{StudentRecords, TaskStore};
use carecall_core::{CareTask, Millis, Result, TaskStatus};

use crate::deadline;

/// Totals of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub promoted: usize,
    pub failed: usize,
}

pub struct Reconciler {
    store: Arc<dyn TaskStore>,
    records: Arc<dyn StudentRecords>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn TaskStore>, records: Arc<dyn StudentRecords>) -> Self {
        Self { store, records }
    }

    /// Promote every waiting task whose enrollment has a later lesson.
    /// A failure on one task is logged and the pass continues.
    pub async fn reconcile_waiting(&self, now: Millis) -> Result<ReconcileReport> {
        let waiting = self.store.list_by_status(TaskStatus::WaitingNextBooking).await?;
        let mut report = ReconcileReport {
            scanned: waiting.len(),
            ..Default::default()
        };
        for task in waiting {
            match self.promote(task, now).await {
                Ok(true) => report.promoted += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("⚠️ Reconcile failed: {e}");
                }
            }
        }
        if report.promoted > 0 || report.failed > 0 {
            tracing::info!(
                "🔄 Reconciled {} waiting tasks: {} promoted, {} failed",
                report.scanned,
                report.promoted,
                report.failed
            );
        }
        Ok(report)
    }

    async fn promote(&self, mut task: CareTask, now: Millis) -> Result<bool> {
        // Lessons ending after the one the task points at supersede it.
        let after = match task.booking_id {
            Some(id) => match self.records.booking(id).await? {
                Some(booking) => booking.end_time,
                None => task.created_at,
            },
            None => task.created_at,
        };
        let Some(next) = self.records.next_booking_after(task.enrollment_id, after).await? else {
            return Ok(false);
        };
        task.status = TaskStatus::NotDone;
        task.booking_id = Some(next.id);
        task.deadline = Some(deadline::after_lesson(next.end_time));
        task.updated_at = now;
        self.store.update(&task).await?;
        tracing::debug!("⏩ Task {} moved to booking {}", task.id, next.id);
        Ok(true)
    }
}

/// Spawn the reconciliation loop as a background tokio task body.
pub async fn spawn_reconciler(reconciler: Arc<Reconciler>, interval_secs: u64) {
    tracing::info!("⏰ Reconciler started (every {}s)", interval_secs);

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;
        if let Err(e) = reconciler.reconcile_waiting(carecall_core::now_millis()).await {
            tracing::warn!("⚠️ Reconcile pass failed: {e}");
        }
    }
}
