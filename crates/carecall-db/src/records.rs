//! Students, enrollments, courses and bookings.
//!
//! Owned by the student-record subsystem; the engine only reads them through
//! [`StudentRecords`]. The write helpers exist for fixtures and the CLI.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params};

use carecall_core::booking::{Booking, BookingStatus, Enrollment, StudentProfile, TerminalCounts};
use carecall_core::error::{CareError, Result};
use carecall_core::traits::StudentRecords;

use crate::CareDb;

const BOOKING_COLUMNS: &str =
    "id, student_id, enrollment_id, course_id, display_order, start_time, end_time, teacher_id, status";

fn read_booking(row: &Row<'_>) -> rusqlite::Result<(Booking, String)> {
    let status: String = row.get(8)?;
    Ok((
        Booking {
            id: row.get(0)?,
            student_id: row.get(1)?,
            enrollment_id: row.get(2)?,
            course_id: row.get(3)?,
            display_order: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            teacher_id: row.get(7)?,
            // Replaced below once the raw status is parsed.
            status: BookingStatus::Scheduled,
        },
        status,
    ))
}

fn finish_booking((mut booking, status): (Booking, String)) -> Result<Booking> {
    booking.status = status.parse()?;
    Ok(booking)
}

impl CareDb {
    /// Insert or replace a student record.
    pub fn upsert_student(&self, profile: &StudentProfile, staff_id: Option<i64>) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO students (id, name, phone, email, input_level, staff_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    profile.id,
                    profile.name,
                    profile.phone,
                    profile.email,
                    profile.input_level,
                    staff_id
                ],
            )
            .map_err(|e| CareError::storage(format!("Save student: {e}")))?;
        Ok(())
    }

    pub fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO enrollments (id, student_id, original_number_class, activation_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    enrollment.id,
                    enrollment.student_id,
                    enrollment.original_number_class,
                    enrollment.activation_date
                ],
            )
            .map_err(|e| CareError::storage(format!("Save enrollment: {e}")))?;
        Ok(())
    }

    pub fn upsert_course(&self, id: i64, name: &str, max_display_order: Option<u32>) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO courses (id, name, max_display_order) VALUES (?1, ?2, ?3)",
                params![id, name, max_display_order],
            )
            .map_err(|e| CareError::storage(format!("Save course: {e}")))?;
        Ok(())
    }

    pub fn upsert_booking(&self, booking: &Booking) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO bookings
                 (id, student_id, enrollment_id, course_id, display_order, start_time, end_time, teacher_id, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    booking.id,
                    booking.student_id,
                    booking.enrollment_id,
                    booking.course_id,
                    booking.display_order,
                    booking.start_time,
                    booking.end_time,
                    booking.teacher_id,
                    booking.status.as_str(),
                ],
            )
            .map_err(|e| CareError::storage(format!("Save booking: {e}")))?;
        Ok(())
    }

    /// Change a booking's status. Returns the status it had before.
    pub fn set_booking_status(&self, booking_id: i64, status: BookingStatus) -> Result<BookingStatus> {
        let conn = self.conn()?;
        let previous: Option<String> = conn
            .query_row("SELECT status FROM bookings WHERE id = ?1", [booking_id], |r| r.get(0))
            .optional()
            .map_err(|e| CareError::storage(format!("Load booking: {e}")))?;
        let previous = previous.ok_or_else(|| CareError::NotFound(format!("booking {booking_id}")))?;
        conn.execute(
            "UPDATE bookings SET status = ?1 WHERE id = ?2",
            params![status.as_str(), booking_id],
        )
        .map_err(|e| CareError::storage(format!("Update booking: {e}")))?;
        previous.parse()
    }
}

#[async_trait]
impl StudentRecords for CareDb {
    async fn booking(&self, booking_id: i64) -> Result<Option<Booking>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                [booking_id],
                read_booking,
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Load booking: {e}")))?;
        raw.map(finish_booking).transpose()
    }

    async fn enrollment(&self, enrollment_id: i64) -> Result<Option<Enrollment>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, student_id, original_number_class, activation_date FROM enrollments WHERE id = ?1",
            [enrollment_id],
            |row| {
                Ok(Enrollment {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    original_number_class: row.get(2)?,
                    activation_date: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| CareError::storage(format!("Load enrollment: {e}")))
    }

    async fn terminal_counts(
        &self,
        student_id: i64,
        enrollment_id: i64,
        exclude_booking: i64,
    ) -> Result<TerminalCounts> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'student_absent' THEN 1 ELSE 0 END), 0)
             FROM bookings
             WHERE student_id = ?1 AND enrollment_id = ?2 AND id != ?3",
            params![student_id, enrollment_id, exclude_booking],
            |row| {
                Ok(TerminalCounts {
                    completed: row.get(0)?,
                    absent: row.get(1)?,
                })
            },
        )
        .map_err(|e| CareError::storage(format!("Count bookings: {e}")))
    }

    async fn max_display_order(&self, course_id: i64) -> Result<Option<u32>> {
        let conn = self.conn()?;
        let value: Option<Option<u32>> = conn
            .query_row(
                "SELECT max_display_order FROM courses WHERE id = ?1",
                [course_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Load course: {e}")))?;
        Ok(value.flatten())
    }

    async fn student_profile(&self, student_id: i64) -> Result<Option<StudentProfile>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, phone, email, input_level FROM students WHERE id = ?1",
            [student_id],
            |row| {
                Ok(StudentProfile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                    email: row.get(3)?,
                    input_level: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(|e| CareError::storage(format!("Load student: {e}")))
    }

    async fn next_booking_after(&self, enrollment_id: i64, after: i64) -> Result<Option<Booking>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {BOOKING_COLUMNS} FROM bookings
                     WHERE enrollment_id = ?1 AND end_time > ?2
                       AND status NOT IN ('cancelled', 'teacher_absent')
                     ORDER BY end_time, id
                     LIMIT 1"
                ),
                params![enrollment_id, after],
                read_booking,
            )
            .optional()
            .map_err(|e| CareError::storage(format!("Load booking: {e}")))?;
        raw.map(finish_booking).transpose()
    }
}
