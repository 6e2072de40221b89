//! `TaskStore` implementation over the `care_tasks` table.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use carecall_core::error::{CareError, Result};
use carecall_core::filter::{DateField, OwnerScope, Page, Pagination, SortDirection, StaffFilter, TaskQuery};
use carecall_core::model::{
    CareTask, Classification, NewCareTask, NoteEntry, Priority, TaskDetail, TaskKey, TaskStatus, TaskType,
};
use carecall_core::now_millis;
use carecall_core::traits::{CreateOutcome, TaskStore};

use crate::{CareDb, FOLD_FUNCTION};

const TASK_COLUMNS: &str = "id, code, student_id, enrollment_id, task_type, lesson_index, status, \
     deadline, priority, sub_type, booking_id, course_id, staff_id, reporter_id, student_name, \
     student_phone, student_email, detail, note_history, created_at, updated_at";

/// Row as stored; enum and JSON columns still raw.
struct TaskRow {
    id: i64,
    code: i64,
    student_id: i64,
    enrollment_id: i64,
    task_type: String,
    lesson_index: u32,
    status: String,
    deadline: Option<i64>,
    priority: Option<String>,
    sub_type: Option<String>,
    booking_id: Option<i64>,
    course_id: Option<i64>,
    staff_id: Option<i64>,
    reporter_id: Option<i64>,
    student_name: String,
    student_phone: String,
    student_email: String,
    detail: String,
    note_history: String,
    created_at: i64,
    updated_at: i64,
}

impl TaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            student_id: row.get(2)?,
            enrollment_id: row.get(3)?,
            task_type: row.get(4)?,
            lesson_index: row.get(5)?,
            status: row.get(6)?,
            deadline: row.get(7)?,
            priority: row.get(8)?,
            sub_type: row.get(9)?,
            booking_id: row.get(10)?,
            course_id: row.get(11)?,
            staff_id: row.get(12)?,
            reporter_id: row.get(13)?,
            student_name: row.get(14)?,
            student_phone: row.get(15)?,
            student_email: row.get(16)?,
            detail: row.get(17)?,
            note_history: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
        })
    }

    fn into_task(self) -> Result<CareTask> {
        let detail: TaskDetail = serde_json::from_str(&self.detail)?;
        let note_history: Vec<NoteEntry> = serde_json::from_str(&self.note_history)?;
        Ok(CareTask {
            id: self.id,
            code: self.code,
            student_id: self.student_id,
            enrollment_id: self.enrollment_id,
            task_type: self.task_type.parse()?,
            lesson_index: self.lesson_index,
            status: self.status.parse()?,
            deadline: self.deadline,
            priority: self.priority.map(|p| p.parse::<Priority>()).transpose()?,
            sub_type: self.sub_type.map(|s| s.parse::<Classification>()).transpose()?,
            booking_id: self.booking_id,
            course_id: self.course_id,
            staff_id: self.staff_id,
            reporter_id: self.reporter_id,
            student_name: self.student_name,
            student_phone: self.student_phone,
            student_email: self.student_email,
            detail,
            note_history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// `%needle%` with LIKE wildcards escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// SQL predicate for `filter` on `column`; `None` when unconstrained.
fn staff_clause(column: &str, filter: &StaffFilter, args: &mut Vec<Value>) -> Option<String> {
    match filter {
        StaffFilter::Unconstrained => None,
        StaffFilter::Unassigned => Some(format!("{column} IS NULL")),
        StaffFilter::Exact(id) => {
            args.push(Value::Integer(*id));
            Some(format!("{column} = ?{}", args.len()))
        }
        StaffFilter::AnyOf(ids) if ids.is_empty() => Some("1 = 0".into()),
        StaffFilter::AnyOf(ids) => {
            let mut slots = Vec::with_capacity(ids.len());
            for id in ids {
                args.push(Value::Integer(*id));
                slots.push(format!("?{}", args.len()));
            }
            Some(format!("{column} IN ({})", slots.join(", ")))
        }
        StaffFilter::NoMatch => Some("1 = 0".into()),
    }
}

/// Visibility predicate: staff-owned, or a periodic report the reporter side admits.
fn scope_clause(scope: &OwnerScope, args: &mut Vec<Value>) -> Option<String> {
    let staff = staff_clause("staff_id", &scope.staff, args)?;
    let periodic = TaskType::PeriodicReport.as_str();
    Some(match staff_clause("reporter_id", &scope.reporter, args) {
        None => format!("({staff} OR task_type = '{periodic}')"),
        Some(reporter) => format!("({staff} OR (task_type = '{periodic}' AND {reporter}))"),
    })
}

fn date_column(field: DateField) -> &'static str {
    match field {
        DateField::Deadline => "deadline",
        DateField::CreatedAt => "created_at",
    }
}

/// WHERE clause + positional args for a query.
fn where_clause(query: &TaskQuery) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(t) = query.task_type {
        args.push(Value::Text(t.as_str().into()));
        clauses.push(format!("task_type = ?{}", args.len()));
    }
    if let Some(s) = query.status {
        args.push(Value::Text(s.as_str().into()));
        clauses.push(format!("status = ?{}", args.len()));
    }
    if let Some(id) = query.student_id {
        args.push(Value::Integer(id));
        clauses.push(format!("student_id = ?{}", args.len()));
    }
    if let Some(id) = query.enrollment_id {
        args.push(Value::Integer(id));
        clauses.push(format!("enrollment_id = ?{}", args.len()));
    }
    if let Some(idx) = query.lesson_index {
        args.push(Value::Integer(i64::from(idx)));
        clauses.push(format!("lesson_index = ?{}", args.len()));
    }
    if let Some(range) = &query.date_range {
        let column = date_column(range.field);
        clauses.push(format!("{column} IS NOT NULL"));
        if let Some(from) = range.from {
            args.push(Value::Integer(from));
            clauses.push(format!("{column} >= ?{}", args.len()));
        }
        if let Some(to) = range.to {
            args.push(Value::Integer(to));
            clauses.push(format!("{column} < ?{}", args.len()));
        }
    }
    if let Some(needle) = &query.search {
        args.push(Value::Text(like_pattern(needle)));
        let n = args.len();
        clauses.push(format!(
            "({FOLD_FUNCTION}(student_name) LIKE ?{n} ESCAPE '\\' \
             OR {FOLD_FUNCTION}(student_phone) LIKE ?{n} ESCAPE '\\' \
             OR {FOLD_FUNCTION}(student_email) LIKE ?{n} ESCAPE '\\')"
        ));
    }
    clauses.extend(scope_clause(&query.scope, &mut args));
    clauses.extend(staff_clause("staff_id", &query.staff, &mut args));
    clauses.extend(staff_clause("reporter_id", &query.reporter, &mut args));

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (sql, args)
}

#[async_trait]
impl TaskStore for CareDb {
    async fn exists(&self, key: &TaskKey) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM care_tasks
                 WHERE student_id = ?1 AND enrollment_id = ?2 AND task_type = ?3 AND lesson_index = ?4",
                params![key.student_id, key.enrollment_id, key.task_type.as_str(), key.lesson_index],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Exists: {e}")))?;
        Ok(found.is_some())
    }

    async fn create(&self, task: NewCareTask) -> Result<CreateOutcome> {
        let detail = serde_json::to_string(&task.detail)?;
        let now = now_millis();
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO care_tasks
             (code, student_id, enrollment_id, task_type, lesson_index, status, deadline, priority,
              sub_type, booking_id, course_id, staff_id, reporter_id, student_name, student_phone,
              student_email, detail, note_history, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, '[]', ?18, ?18)",
            params![
                task.code,
                task.key.student_id,
                task.key.enrollment_id,
                task.key.task_type.as_str(),
                task.key.lesson_index,
                task.status.as_str(),
                task.deadline,
                task.priority.map(|p| p.as_str()),
                task.sub_type.map(|s| s.as_str()),
                task.booking_id,
                task.course_id,
                task.staff_id,
                task.reporter_id,
                task.student_name,
                task.student_phone,
                task.student_email,
                detail,
                now,
            ],
        );
        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                Ok(CreateOutcome::Created(CareTask::from_new(id, task, now)))
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!("⏭️ Task {} already stored", task.key);
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(CareError::storage(format!("Create task: {e}"))),
        }
    }

    async fn find(&self, id: i64) -> Result<Option<CareTask>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM care_tasks WHERE id = ?1"),
                [id],
                TaskRow::read,
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Find task: {e}")))?;
        row.map(TaskRow::into_task).transpose()
    }

    async fn find_by_key(&self, key: &TaskKey) -> Result<Option<CareTask>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM care_tasks
                     WHERE student_id = ?1 AND enrollment_id = ?2 AND task_type = ?3 AND lesson_index = ?4"
                ),
                params![key.student_id, key.enrollment_id, key.task_type.as_str(), key.lesson_index],
                TaskRow::read,
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Find task: {e}")))?;
        row.map(TaskRow::into_task).transpose()
    }

    async fn update(&self, task: &CareTask) -> Result<()> {
        let detail = serde_json::to_string(&task.detail)?;
        let notes = serde_json::to_string(&task.note_history)?;
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE care_tasks SET status = ?1, deadline = ?2, priority = ?3, sub_type = ?4,
                 booking_id = ?5, staff_id = ?6, reporter_id = ?7, detail = ?8, note_history = ?9,
                 updated_at = ?10
                 WHERE id = ?11",
                params![
                    task.status.as_str(),
                    task.deadline,
                    task.priority.map(|p| p.as_str()),
                    task.sub_type.map(|s| s.as_str()),
                    task.booking_id,
                    task.staff_id,
                    task.reporter_id,
                    detail,
                    notes,
                    task.updated_at,
                    task.id,
                ],
            )
            .map_err(|e| CareError::storage(format!("Update task: {e}")))?;
        if changed == 0 {
            return Err(CareError::NotFound(format!("care task {}", task.id)));
        }
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM care_tasks WHERE id = ?1", [id])
            .map_err(|e| CareError::storage(format!("Remove task: {e}")))?;
        Ok(deleted > 0)
    }

    async fn query(&self, query: &TaskQuery) -> Result<Page<CareTask>> {
        let (filter, args) = where_clause(query);
        let column = date_column(query.sort_field);
        let direction = match query.sort_direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };

        let mut conn = self.conn()?;
        // Count and page read from the same snapshot.
        let tx = conn
            .transaction()
            .map_err(|e| CareError::storage(format!("Begin: {e}")))?;

        let total: i64 = tx
            .query_row(
                &format!("SELECT COUNT(*) FROM care_tasks {filter}"),
                params_from_iter(args.iter()),
                |r| r.get(0),
            )
            .map_err(|e| CareError::storage(format!("Count tasks: {e}")))?;

        let mut page_args = args.clone();
        page_args.push(Value::Integer(i64::from(query.page_size)));
        let limit_slot = page_args.len();
        page_args.push(Value::Integer(i64::try_from(query.offset()).unwrap_or(i64::MAX)));
        let offset_slot = page_args.len();

        let rows: Vec<TaskRow> = {
            let mut stmt = tx
                .prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM care_tasks {filter}
                     ORDER BY {column} IS NULL, {column} {direction}, id ASC
                     LIMIT ?{limit_slot} OFFSET ?{offset_slot}"
                ))
                .map_err(|e| CareError::storage(format!("Query tasks: {e}")))?;
            let mapped = stmt
                .query_map(params_from_iter(page_args.iter()), TaskRow::read)
                .map_err(|e| CareError::storage(format!("Query tasks: {e}")))?;
            mapped
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| CareError::storage(format!("Read tasks: {e}")))?
        };
        tx.commit()
            .map_err(|e| CareError::storage(format!("Commit: {e}")))?;

        let data = rows
            .into_iter()
            .map(TaskRow::into_task)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            data,
            pagination: Pagination {
                total: u64::try_from(total).unwrap_or(0),
                page: query.page,
                page_size: query.page_size,
            },
        })
    }

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<CareTask>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM care_tasks WHERE status = ?1 ORDER BY created_at, id"
            ))
            .map_err(|e| CareError::storage(format!("List tasks: {e}")))?;
        let rows = stmt
            .query_map([status.as_str()], TaskRow::read)
            .map_err(|e| CareError::storage(format!("List tasks: {e}")))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| CareError::storage(format!("Read tasks: {e}")))?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_core::filter::DateRange;

    fn new_task(student_id: i64, task_type: TaskType, lesson_index: u32) -> NewCareTask {
        NewCareTask {
            key: TaskKey {
                student_id,
                enrollment_id: 10,
                task_type,
                lesson_index,
            },
            code: 1,
            status: TaskStatus::NotDone,
            deadline: Some(1_000 * i64::from(lesson_index)),
            priority: None,
            sub_type: None,
            booking_id: Some(500),
            course_id: Some(7),
            staff_id: Some(42),
            reporter_id: None,
            student_name: format!("Student {student_id}"),
            student_phone: "0900".into(),
            student_email: format!("s{student_id}@mail.test"),
            detail: TaskDetail::checking(),
        }
    }

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let db = CareDb::open_in_memory().unwrap();
        let task = new_task(1, TaskType::Checking, 3);
        let key = task.key;

        assert!(!db.exists(&key).await.unwrap());
        let first = db.create(task.clone()).await.unwrap();
        assert!(matches!(first, CreateOutcome::Created(_)));
        assert!(db.exists(&key).await.unwrap());

        let second = db.create(task).await.unwrap();
        assert_eq!(second, CreateOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_same_index_different_type_is_distinct() {
        let db = CareDb::open_in_memory().unwrap();
        db.create(new_task(1, TaskType::Checking, 20)).await.unwrap();
        let other = db.create(new_task(1, TaskType::PeriodicReport, 20)).await.unwrap();
        assert!(matches!(other, CreateOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_round_trip_fields() {
        let db = CareDb::open_in_memory().unwrap();
        let mut task = new_task(2, TaskType::PeriodicReport, 20);
        task.priority = Some(Priority::High);
        task.sub_type = Some(Classification::EndTerm);
        task.detail = TaskDetail::PeriodicReport {
            total_completed: 19,
            total_absent: 1,
            input_level: 4,
        };
        let CreateOutcome::Created(created) = db.create(task).await.unwrap() else {
            panic!("expected creation");
        };

        let loaded = db.find(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.priority, Some(Priority::High));
        assert_eq!(loaded.sub_type, Some(Classification::EndTerm));
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let db = CareDb::open_in_memory().unwrap();
        let CreateOutcome::Created(mut task) = db.create(new_task(3, TaskType::Checking, 3)).await.unwrap() else {
            panic!("expected creation");
        };
        task.status = TaskStatus::Done;
        task.note_history.push(NoteEntry {
            author_id: 42,
            body: "called".into(),
            created_at: 5,
        });
        db.update(&task).await.unwrap();

        let loaded = db.find(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Done);
        assert_eq!(loaded.note_history.len(), 1);

        assert!(db.remove(task.id).await.unwrap());
        assert!(!db.remove(task.id).await.unwrap());
        assert!(matches!(db.update(&task).await, Err(CareError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_query_filters_and_total() {
        let db = CareDb::open_in_memory().unwrap();
        for student in 1..=5 {
            let mut task = new_task(student, TaskType::Checking, 3);
            task.staff_id = if student % 2 == 0 { Some(42) } else { None };
            db.create(task).await.unwrap();
        }
        db.create(new_task(9, TaskType::Observation, 8)).await.unwrap();

        let query = TaskQuery {
            task_type: Some(TaskType::Checking),
            staff: StaffFilter::Unassigned,
            page_size: 2,
            ..Default::default()
        };
        let page = db.query(&query).await.unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.data.len(), 2);

        let last = db.query(&TaskQuery { page: 2, ..query.clone() }).await.unwrap();
        assert_eq!(last.data.len(), 1);
        assert_eq!(last.pagination.total, 3);

        let none = db
            .query(&TaskQuery {
                staff: StaffFilter::NoMatch,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(none.pagination.total, 0);
        assert!(none.data.is_empty());
    }

    #[tokio::test]
    async fn test_query_search_and_date_range() {
        let db = CareDb::open_in_memory().unwrap();
        db.create(new_task(1, TaskType::Checking, 3)).await.unwrap();
        db.create(new_task(2, TaskType::Checking, 30)).await.unwrap();

        let by_email = db
            .query(&TaskQuery {
                search: Some("S2@MAIL".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_email.pagination.total, 1);
        assert_eq!(by_email.data[0].student_id, 2);

        // deadline = 1000 * lesson_index → 3000 and 30000
        let ranged = db
            .query(&TaskQuery {
                date_range: Some(DateRange {
                    field: DateField::Deadline,
                    from: Some(3_000),
                    to: Some(30_000),
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.pagination.total, 1);
        assert_eq!(ranged.data[0].lesson_index, 3);
    }

    #[tokio::test]
    async fn test_like_wildcards_are_literal() {
        let db = CareDb::open_in_memory().unwrap();
        db.create(new_task(1, TaskType::Checking, 3)).await.unwrap();
        let page = db
            .query(&TaskQuery {
                search: Some("%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii() {
        let db = CareDb::open_in_memory().unwrap();
        let mut task = new_task(1, TaskType::Checking, 3);
        task.student_name = "NGUYỄN LÂN".into();
        db.create(task).await.unwrap();
        db.create(new_task(2, TaskType::Checking, 3)).await.unwrap();

        for needle in ["lân", "Lân", "nguyễn"] {
            let query = TaskQuery {
                search: Some(needle.into()),
                ..Default::default()
            };
            let page = db.query(&query).await.unwrap();
            assert_eq!(page.pagination.total, 1, "{needle}");
            assert!(query.matches(&page.data[0]));
        }
    }

    #[tokio::test]
    async fn test_scope_admits_periodic_by_reporter() {
        let db = CareDb::open_in_memory().unwrap();
        let mut periodic = new_task(1, TaskType::PeriodicReport, 10);
        periodic.staff_id = Some(8);
        periodic.reporter_id = Some(300);
        db.create(periodic).await.unwrap();
        let mut checking = new_task(2, TaskType::Checking, 3);
        checking.staff_id = Some(8);
        checking.reporter_id = Some(300);
        db.create(checking).await.unwrap();
        db.create(new_task(3, TaskType::Checking, 3)).await.unwrap();

        let scoped = |staff, reporter| TaskQuery {
            scope: OwnerScope { staff, reporter },
            ..Default::default()
        };
        let cases = [
            // reporter side only reaches the periodic report
            (scoped(StaffFilter::Exact(300), StaffFilter::Exact(300)), vec![1]),
            (scoped(StaffFilter::Exact(8), StaffFilter::NoMatch), vec![1, 2]),
            (scoped(StaffFilter::AnyOf(vec![8, 42]), StaffFilter::Exact(300)), vec![1, 2, 3]),
            (scoped(StaffFilter::NoMatch, StaffFilter::Unconstrained), vec![1]),
            (scoped(StaffFilter::Unconstrained, StaffFilter::NoMatch), vec![1, 2, 3]),
        ];
        for (query, expected) in cases {
            let page = db.query(&query).await.unwrap();
            let mut students: Vec<i64> = page.data.iter().map(|t| t.student_id).collect();
            students.sort_unstable();
            assert_eq!(students, expected, "{:?}", query.scope);
            assert_eq!(page.pagination.total, expected.len() as u64);
        }
    }

    #[tokio::test]
    async fn test_sort_direction() {
        let db = CareDb::open_in_memory().unwrap();
        for idx in [3, 20, 8] {
            db.create(new_task(1, TaskType::Checking, idx)).await.unwrap();
        }
        let desc = db
            .query(&TaskQuery {
                sort_direction: SortDirection::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        let order: Vec<u32> = desc.data.iter().map(|t| t.lesson_index).collect();
        assert_eq!(order, vec![20, 8, 3]);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let db = CareDb::open_in_memory().unwrap();
        let mut waiting = new_task(1, TaskType::Checking, 3);
        waiting.status = TaskStatus::WaitingNextBooking;
        db.create(waiting).await.unwrap();
        db.create(new_task(2, TaskType::Checking, 3)).await.unwrap();

        let list = db.list_by_status(TaskStatus::WaitingNextBooking).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].student_id, 1);
    }
}
