//! Ownership resolver: the visible staff set of a requester, reconciled
//! with an explicit staff filter.
//!
//! Rules:
//! - manager / deputy manager: department-wide, no team scoping
//! - team leader: self plus team members
//! - anyone else: self only
//! - periodic reports are also visible through the academic reporter chain
//!
//! Explicit filter:
//! - none → the visible set
//! - `-1` → unassigned rows for department-wide roles, nothing otherwise
//! - an id inside the visible set → exactly that id
//! - an id outside → nothing (never widened)

use std::sync::Arc;

use carecall_core::config::DepartmentConfig;
use carecall_core::traits::StaffDirectory;
use carecall_core::{CareError, CareTask, OwnerScope, Requester, Result, StaffFilter, TaskType, TeamLookup};

/// Raw value that selects unassigned rows.
pub const UNASSIGNED_SENTINEL: &str = "-1";

/// Parsed explicit staff filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffSelector {
    Unassigned,
    Id(i64),
}

impl StaffSelector {
    /// Parse the raw input value. `None` or blank means no explicit filter.
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        if raw == UNASSIGNED_SENTINEL {
            return Ok(Some(StaffSelector::Unassigned));
        }
        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Some(StaffSelector::Id(id))),
            _ => Err(CareError::validation(format!("invalid staff id '{raw}'"))),
        }
    }
}

/// Staff ids whose rows a requester may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleSet {
    DepartmentWide,
    Members(Vec<i64>),
}

impl VisibleSet {
    pub fn contains(&self, staff_id: i64) -> bool {
        match self {
            VisibleSet::DepartmentWide => true,
            VisibleSet::Members(ids) => ids.contains(&staff_id),
        }
    }

    /// Reconcile with an explicit filter.
    pub fn reconcile(&self, explicit: Option<StaffSelector>) -> StaffFilter {
        match (self, explicit) {
            (VisibleSet::DepartmentWide, None) => StaffFilter::Unconstrained,
            (VisibleSet::Members(ids), None) => match ids.as_slice() {
                [only] => StaffFilter::Exact(*only),
                _ => StaffFilter::AnyOf(ids.clone()),
            },
            (VisibleSet::DepartmentWide, Some(StaffSelector::Unassigned)) => StaffFilter::Unassigned,
            (VisibleSet::Members(_), Some(StaffSelector::Unassigned)) => StaffFilter::NoMatch,
            (set, Some(StaffSelector::Id(id))) if set.contains(id) => StaffFilter::Exact(id),
            (_, Some(StaffSelector::Id(_))) => StaffFilter::NoMatch,
        }
    }
}

/// Which owner column a staff set is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerColumn {
    /// `staff_id`, resolved against the care department.
    Staff,
    /// `reporter_id`, resolved against the academic department.
    Reporter,
}

pub struct OwnershipResolver {
    directory: Arc<dyn StaffDirectory>,
    care_code: String,
    academic_code: String,
}

impl OwnershipResolver {
    pub fn new(directory: Arc<dyn StaffDirectory>, departments: &DepartmentConfig) -> Self {
        Self {
            directory,
            care_code: departments.care_code.clone(),
            academic_code: departments.academic_code.clone(),
        }
    }

    /// Look up an admin id. Unknown admins are forbidden.
    pub async fn requester(&self, admin_id: i64) -> Result<Requester> {
        self.directory
            .requester(admin_id)
            .await?
            .ok_or_else(|| CareError::Forbidden(format!("unknown admin {admin_id}")))
    }

    /// Visible staff set of `requester` in the department owning `column`.
    pub async fn visible_set(&self, requester: &Requester, column: OwnerColumn) -> Result<VisibleSet> {
        if requester.role.is_department_wide() {
            return Ok(VisibleSet::DepartmentWide);
        }
        let code = match column {
            OwnerColumn::Staff => &self.care_code,
            OwnerColumn::Reporter => &self.academic_code,
        };
        let department = self
            .directory
            .find_department_by_code(code)
            .await?
            .ok_or_else(|| CareError::reference("department", code.clone()))?;
        let team = self
            .directory
            .find_team(TeamLookup::containing(department.id, requester.id))
            .await?;
        Ok(match team {
            Some(team) if team.leader_id == requester.id => {
                let mut ids = vec![requester.id];
                ids.extend(team.member_ids.iter().copied().filter(|m| *m != requester.id));
                VisibleSet::Members(ids)
            }
            _ => VisibleSet::Members(vec![requester.id]),
        })
    }

    /// Resolve the filter applied to `column` for a listing.
    pub async fn resolve(
        &self,
        requester: &Requester,
        column: OwnerColumn,
        explicit: Option<StaffSelector>,
    ) -> Result<StaffFilter> {
        let visible = self.visible_set(requester, column).await?;
        let filter = visible.reconcile(explicit);
        tracing::debug!("🔐 Admin {} ({}) {column:?} filter: {filter:?}", requester.id, requester.role);
        Ok(filter)
    }

    /// Visibility scope of `requester` for listings of `task_type` (`None`
    /// for untyped listings). Periodic reports are visible through either
    /// their care staff or their academic reporter chain.
    pub async fn scope(&self, requester: &Requester, task_type: Option<TaskType>) -> Result<OwnerScope> {
        if requester.role.is_department_wide() {
            return Ok(OwnerScope::default());
        }
        let staff = self.resolve(requester, OwnerColumn::Staff, None).await?;
        let reporter = match task_type {
            None | Some(TaskType::PeriodicReport) => self.resolve(requester, OwnerColumn::Reporter, None).await?,
            Some(
                TaskType::Greeting
                | TaskType::Checking
                | TaskType::Observation
                | TaskType::UpcomingTest
                | TaskType::TestReport,
            ) => StaffFilter::NoMatch,
        };
        Ok(OwnerScope { staff, reporter })
    }

    /// Whether `requester` may see `task`. Same scope as the listings.
    pub async fn can_see(&self, requester: &Requester, task: &CareTask) -> Result<bool> {
        Ok(self.scope(requester, Some(task.task_type)).await?.admits(task))
    }
}
