//! Task listing façade: validates raw caller input, applies the ownership
//! constraint and hands one resolved query to the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use carecall_core::config::QueryConfig;
use carecall_core::filter::Pagination;
use carecall_core::traits::TaskStore;
use carecall_core::{
    CareError, CareTask, DateField, DateRange, Millis, Page, Requester, Result, SortDirection,
    StaffFilter, TaskKey, TaskQuery, TaskStatus, TaskType,
};

use crate::ownership::{OwnerColumn, OwnershipResolver, StaffSelector};

/// Raw listing input as it arrives from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskListRequest {
    pub task_type: Option<String>,
    pub status: Option<String>,
    pub student_id: Option<i64>,
    pub enrollment_id: Option<i64>,
    pub lesson_index: Option<u32>,
    /// "deadline" (default) or "created_at"; used by the range and the sort.
    pub date_field: Option<String>,
    pub date_from: Option<Millis>,
    pub date_to: Option<Millis>,
    pub search: Option<String>,
    /// Staff id, or "-1" for unassigned.
    pub staff_id: Option<String>,
    /// Reporter id for periodic reports, or "-1".
    pub reporter_id: Option<String>,
    /// "asc" or "desc".
    pub sort_direction: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

fn parse_date_field(raw: &str) -> Result<DateField> {
    match raw {
        "deadline" => Ok(DateField::Deadline),
        "created_at" => Ok(DateField::CreatedAt),
        other => Err(CareError::validation(format!("unknown date field '{other}'"))),
    }
}

fn parse_direction(raw: &str) -> Result<SortDirection> {
    match raw.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortDirection::Asc),
        "desc" => Ok(SortDirection::Desc),
        other => Err(CareError::validation(format!("unknown sort direction '{other}'"))),
    }
}

/// Default ordering of a listing.
pub fn default_sort(task_type: Option<TaskType>) -> (DateField, SortDirection) {
    match task_type {
        Some(TaskType::Greeting) | None => (DateField::CreatedAt, SortDirection::Desc),
        Some(
            TaskType::Checking
            | TaskType::Observation
            | TaskType::UpcomingTest
            | TaskType::TestReport
            | TaskType::PeriodicReport,
        ) => (DateField::Deadline, SortDirection::Asc),
    }
}

pub struct TaskQueryFacade {
    store: Arc<dyn TaskStore>,
    resolver: Arc<OwnershipResolver>,
    config: QueryConfig,
}

impl TaskQueryFacade {
    pub fn new(store: Arc<dyn TaskStore>, resolver: Arc<OwnershipResolver>, config: QueryConfig) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    /// Validate `request` and resolve it into a store query for `requester`.
    pub async fn build_query(&self, requester: &Requester, request: &TaskListRequest) -> Result<TaskQuery> {
        let task_type = request
            .task_type
            .as_deref()
            .map(str::parse::<TaskType>)
            .transpose()?;
        let status = request
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?;

        let (default_field, default_direction) = default_sort(task_type);
        let sort_field = request
            .date_field
            .as_deref()
            .map(parse_date_field)
            .transpose()?
            .unwrap_or(default_field);
        let sort_direction = request
            .sort_direction
            .as_deref()
            .map(parse_direction)
            .transpose()?
            .unwrap_or(default_direction);

        let date_range = match (request.date_from, request.date_to) {
            (None, None) => None,
            (Some(from), Some(to)) if from > to => {
                return Err(CareError::validation(format!("inverted date range {from}..{to}")));
            }
            (from, to) => Some(DateRange {
                field: sort_field,
                from,
                to,
            }),
        };

        let page = request.page.unwrap_or(1);
        if page == 0 {
            return Err(CareError::validation("page starts at 1"));
        }
        let page_size = match request.page_size {
            Some(0) => return Err(CareError::validation("page_size must be positive")),
            Some(size) => size.min(self.config.max_page_size),
            None => self.config.default_page_size,
        };

        let staff_selector = StaffSelector::parse(request.staff_id.as_deref())?;
        let reporter_selector = StaffSelector::parse(request.reporter_id.as_deref())?;
        if reporter_selector.is_some() && task_type != Some(TaskType::PeriodicReport) {
            return Err(CareError::validation("reporter_id applies to periodic reports only"));
        }

        // Visibility follows `OwnershipResolver::can_see`; explicit filters
        // only narrow it.
        let scope = self.resolver.scope(requester, task_type).await?;
        let staff = match staff_selector {
            Some(_) => self.resolver.resolve(requester, OwnerColumn::Staff, staff_selector).await?,
            None => StaffFilter::Unconstrained,
        };
        let reporter = match reporter_selector {
            Some(_) => {
                self.resolver
                    .resolve(requester, OwnerColumn::Reporter, reporter_selector)
                    .await?
            }
            None => StaffFilter::Unconstrained,
        };

        Ok(TaskQuery {
            task_type,
            status,
            student_id: request.student_id,
            enrollment_id: request.enrollment_id,
            lesson_index: request.lesson_index,
            date_range,
            search: request
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            scope,
            staff,
            reporter,
            sort_field,
            sort_direction,
            page,
            page_size,
        })
    }

    /// One page of tasks visible to `requester`, with the total.
    pub async fn list(&self, requester: &Requester, request: &TaskListRequest) -> Result<Page<CareTask>> {
        let query = self.build_query(requester, request).await?;
        if query.is_unsatisfiable() {
            return Ok(Page {
                data: Vec::new(),
                pagination: Pagination {
                    total: 0,
                    page: query.page,
                    page_size: query.page_size,
                },
            });
        }
        self.store.query(&query).await
    }

    /// Read one task back by its unique key, scoped like a listing.
    pub async fn find_by_key(&self, requester: &Requester, key: &TaskKey) -> Result<Option<CareTask>> {
        let request = TaskListRequest {
            task_type: Some(key.task_type.as_str().to_string()),
            student_id: Some(key.student_id),
            enrollment_id: Some(key.enrollment_id),
            lesson_index: Some(key.lesson_index),
            page_size: Some(1),
            ..Default::default()
        };
        Ok(self.list(requester, &request).await?.data.into_iter().next())
    }
}
