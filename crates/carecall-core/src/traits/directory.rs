//! Staff assignment, department and team lookups.

use async_trait::async_trait;

use crate::error::Result;
use crate::staff::{Department, Requester, Team, TeamLookup};

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// Care staff assigned to the student, if any.
    async fn assigned_staff(&self, student_id: i64) -> Result<Option<i64>>;

    async fn find_department_by_code(&self, code: &str) -> Result<Option<Department>>;

    async fn find_team(&self, lookup: TeamLookup) -> Result<Option<Team>>;

    /// Resolve an admin id into a requester (role + department).
    async fn requester(&self, admin_id: i64) -> Result<Option<Requester>>;
}

/// Named sequences for human-facing ids.
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    async fn next_id(&self, sequence: &str) -> Result<i64>;
}
