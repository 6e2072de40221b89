//! Query filters shared by the façade and the storage layer.

use serde::{Deserialize, Serialize};

use crate::Millis;
use crate::model::{CareTask, TaskStatus, TaskType};

/// Resolved constraint on a staff-owned column (`staff_id` or `reporter_id`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "ids", rename_all = "snake_case")]
pub enum StaffFilter {
    /// No constraint at all.
    #[default]
    Unconstrained,
    /// Only rows with no owner.
    Unassigned,
    /// Rows owned by exactly this staff member.
    Exact(i64),
    /// Rows owned by any of these staff members.
    AnyOf(Vec<i64>),
    /// Unsatisfiable: the query returns zero rows.
    NoMatch,
}

impl StaffFilter {
    /// Whether a row with `owner` passes this filter.
    pub fn admits(&self, owner: Option<i64>) -> bool {
        match self {
            StaffFilter::Unconstrained => true,
            StaffFilter::Unassigned => owner.is_none(),
            StaffFilter::Exact(id) => owner == Some(*id),
            StaffFilter::AnyOf(ids) => owner.is_some_and(|o| ids.contains(&o)),
            StaffFilter::NoMatch => false,
        }
    }
}

/// Rows a requester may see. A row is in scope when its `staff_id` passes
/// `staff`; a periodic report is also in scope when its `reporter_id`
/// passes `reporter`. The default scope admits everything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OwnerScope {
    pub staff: StaffFilter,
    pub reporter: StaffFilter,
}

impl OwnerScope {
    pub fn admits(&self, task: &CareTask) -> bool {
        self.staff.admits(task.staff_id)
            || (task.task_type == TaskType::PeriodicReport && self.reporter.admits(task.reporter_id))
    }

    /// Whether no row can be in scope.
    pub fn is_empty(&self) -> bool {
        self.staff == StaffFilter::NoMatch && self.reporter == StaffFilter::NoMatch
    }
}

/// Date column a range or sort applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    #[default]
    Deadline,
    CreatedAt,
}

impl DateField {
    pub fn value(&self, task: &CareTask) -> Option<Millis> {
        match self {
            DateField::Deadline => task.deadline,
            DateField::CreatedAt => Some(task.created_at),
        }
    }
}

/// `[from, to)` over one date column; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub field: DateField,
    pub from: Option<Millis>,
    pub to: Option<Millis>,
}

impl DateRange {
    pub fn contains(&self, value: Option<Millis>) -> bool {
        let Some(v) = value else {
            return false;
        };
        self.from.is_none_or(|f| v >= f) && self.to.is_none_or(|t| v < t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Fully resolved listing query handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub student_id: Option<i64>,
    pub enrollment_id: Option<i64>,
    pub lesson_index: Option<u32>,
    pub date_range: Option<DateRange>,
    /// Case-insensitive substring over student name, phone and email.
    pub search: Option<String>,
    /// Requester visibility.
    pub scope: OwnerScope,
    /// Explicit narrowing of `staff_id`.
    pub staff: StaffFilter,
    /// Explicit narrowing of `reporter_id`.
    pub reporter: StaffFilter,
    pub sort_field: DateField,
    pub sort_direction: SortDirection,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            task_type: None,
            status: None,
            student_id: None,
            enrollment_id: None,
            lesson_index: None,
            date_range: None,
            search: None,
            scope: OwnerScope::default(),
            staff: StaffFilter::Unconstrained,
            reporter: StaffFilter::Unconstrained,
            sort_field: DateField::Deadline,
            sort_direction: SortDirection::Asc,
            page: 1,
            page_size: 20,
        }
    }
}

impl TaskQuery {
    /// Row offset of the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Whether a task satisfies every predicate (pagination aside).
    pub fn matches(&self, task: &CareTask) -> bool {
        if self.task_type.is_some_and(|t| t != task.task_type)
            || self.status.is_some_and(|s| s != task.status)
            || self.student_id.is_some_and(|s| s != task.student_id)
            || self.enrollment_id.is_some_and(|e| e != task.enrollment_id)
            || self.lesson_index.is_some_and(|l| l != task.lesson_index)
        {
            return false;
        }
        if let Some(range) = &self.date_range
            && !range.contains(range.field.value(task))
        {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase)
            && ![&task.student_name, &task.student_phone, &task.student_email]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        {
            return false;
        }
        self.scope.admits(task) && self.staff.admits(task.staff_id) && self.reporter.admits(task.reporter_id)
    }

    /// Whether the query can be answered as empty without touching storage.
    pub fn is_unsatisfiable(&self) -> bool {
        self.scope.is_empty() || self.staff == StaffFilter::NoMatch || self.reporter == StaffFilter::NoMatch
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// One page of results plus the total matching the same filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
