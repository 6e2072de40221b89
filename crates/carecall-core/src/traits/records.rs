//! Student, enrollment and booking lookups owned by the student-record subsystem.

use async_trait::async_trait;

use crate::booking::{Booking, Enrollment, StudentProfile, TerminalCounts};
use crate::error::Result;

#[async_trait]
pub trait StudentRecords: Send + Sync {
    async fn booking(&self, booking_id: i64) -> Result<Option<Booking>>;

    async fn enrollment(&self, enrollment_id: i64) -> Result<Option<Enrollment>>;

    /// Terminal bookings of the enrollment, excluding `exclude_booking`.
    async fn terminal_counts(
        &self,
        student_id: i64,
        enrollment_id: i64,
        exclude_booking: i64,
    ) -> Result<TerminalCounts>;

    /// Highest unit display order in the course curriculum.
    async fn max_display_order(&self, course_id: i64) -> Result<Option<u32>>;

    async fn student_profile(&self, student_id: i64) -> Result<Option<StudentProfile>>;

    /// Earliest booking of the enrollment ending after `after`, excluding
    /// cancelled lessons.
    async fn next_booking_after(&self, enrollment_id: i64, after: i64) -> Result<Option<Booking>>;
}
