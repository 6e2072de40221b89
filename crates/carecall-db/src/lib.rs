//! SQLite-backed persistence for CareCall.
//!
//! One database holds the care tasks plus the read-only collaborator data
//! the engine consults (students, enrollments, bookings, departments,
//! teams, admins). [`CareDb`] implements every storage trait from
//! `carecall_core::traits`.
//!
//! Idempotency lives here: `care_tasks` carries a unique index on
//! `(student_id, enrollment_id, task_type, lesson_index)` and a violation on
//! insert comes back as `CreateOutcome::AlreadyExists`.

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use carecall_core::error::{CareError, Result};

pub mod records;
pub mod seed;
pub mod staff;
pub mod tasks;

pub use seed::Fixture;

/// Unicode case fold for task search, matching Rust's `to_lowercase`.
/// SQLite's `lower` folds ASCII only.
pub(crate) const FOLD_FUNCTION: &str = "fold";

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
    .map_err(|e| CareError::storage(format!("Register {FOLD_FUNCTION}: {e}")))
}

/// CareCall database: tasks plus collaborator records.
pub struct CareDb {
    conn: Mutex<Connection>,
}

impl CareDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| CareError::storage(format!("DB open: {e}")))?;

        // WAL for concurrent readers
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let db = Self::with_connection(conn)?;
        tracing::debug!("🗄️ Care database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| CareError::storage(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CareError::storage(format!("Lock: {e}")))
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            -- Care tasks
            CREATE TABLE IF NOT EXISTS care_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code INTEGER NOT NULL,
                student_id INTEGER NOT NULL,
                enrollment_id INTEGER NOT NULL,
                task_type TEXT NOT NULL,
                lesson_index INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'not_done',
                deadline INTEGER,                 -- epoch millis
                priority TEXT,
                sub_type TEXT,
                booking_id INTEGER,
                course_id INTEGER,
                staff_id INTEGER,
                reporter_id INTEGER,
                student_name TEXT NOT NULL DEFAULT '',
                student_phone TEXT NOT NULL DEFAULT '',
                student_email TEXT NOT NULL DEFAULT '',
                detail TEXT NOT NULL,             -- JSON, tagged by kind
                note_history TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS care_tasks_unique_key
                ON care_tasks (student_id, enrollment_id, task_type, lesson_index);
            CREATE INDEX IF NOT EXISTS care_tasks_listing
                ON care_tasks (task_type, status, staff_id);

            -- Students (denormalized onto tasks at creation)
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                input_level INTEGER,
                staff_id INTEGER                  -- assigned care staff
            );

            CREATE TABLE IF NOT EXISTS enrollments (
                id INTEGER PRIMARY KEY,
                student_id INTEGER NOT NULL,
                original_number_class INTEGER NOT NULL DEFAULT 0,
                activation_date INTEGER
            );

            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                max_display_order INTEGER
            );

            CREATE TABLE IF NOT EXISTS bookings (
                id INTEGER PRIMARY KEY,
                student_id INTEGER NOT NULL,
                enrollment_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                display_order INTEGER NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                teacher_id INTEGER,
                status TEXT NOT NULL DEFAULT 'scheduled'
            );
            CREATE INDEX IF NOT EXISTS bookings_enrollment
                ON bookings (enrollment_id, status);

            -- Staff hierarchy
            CREATE TABLE IF NOT EXISTS departments (
                id INTEGER PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY,
                department_id INTEGER NOT NULL REFERENCES departments(id),
                name TEXT NOT NULL DEFAULT '',
                leader_id INTEGER NOT NULL,
                UNIQUE (department_id, leader_id)
            );

            CREATE TABLE IF NOT EXISTS team_members (
                team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
                staff_id INTEGER NOT NULL,
                PRIMARY KEY (team_id, staff_id)
            );

            CREATE TABLE IF NOT EXISTS admins (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                department_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'staff'
            );

            -- Named counters for human-facing ids
            CREATE TABLE IF NOT EXISTS sequences (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL DEFAULT 0
            );
            ",
        )
        .map_err(|e| CareError::storage(format!("Migration: {e}")))?;
        Ok(())
    }
}
