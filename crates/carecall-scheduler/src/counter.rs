//! Completion counter.

use carecall_core::traits::StudentRecords;
use carecall_core::{Booking, BookingStatus, Result, TerminalCounts};

/// Terminal lessons of an enrollment with the current event applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Trigger value for counter-indexed task types.
    pub count: u32,
    pub counts: TerminalCounts,
}

/// Count terminal bookings of the enrollment other than `booking`, then
/// apply `new_status`. Recomputed on every event; the result does not
/// depend on whether the booking's own status was persisted yet.
pub async fn completion(
    records: &dyn StudentRecords,
    booking: &Booking,
    new_status: BookingStatus,
) -> Result<Completion> {
    let prior = records
        .terminal_counts(booking.student_id, booking.enrollment_id, booking.id)
        .await?;
    Ok(Completion {
        count: prior.total() + 1,
        counts: prior.with(new_status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_db::CareDb;

    fn booking(id: i64, status: BookingStatus) -> Booking {
        Booking {
            id,
            student_id: 1,
            enrollment_id: 10,
            course_id: 7,
            display_order: id as u32,
            start_time: id * 10_000,
            end_time: id * 10_000 + 5_000,
            teacher_id: None,
            status,
        }
    }

    #[tokio::test]
    async fn test_counter_independent_of_persisted_status() {
        let db = CareDb::open_in_memory().unwrap();
        db.upsert_booking(&booking(1, BookingStatus::Completed)).unwrap();
        db.upsert_booking(&booking(2, BookingStatus::StudentAbsent)).unwrap();
        db.upsert_booking(&booking(3, BookingStatus::Scheduled)).unwrap();

        let before = completion(&db, &booking(3, BookingStatus::Scheduled), BookingStatus::Completed)
            .await
            .unwrap();
        db.set_booking_status(3, BookingStatus::Completed).unwrap();
        let after = completion(&db, &booking(3, BookingStatus::Completed), BookingStatus::Completed)
            .await
            .unwrap();

        assert_eq!(before, after);
        assert_eq!(after.count, 3);
        assert_eq!(after.counts, TerminalCounts { completed: 2, absent: 1 });
    }

    #[tokio::test]
    async fn test_absent_counts_like_completed() {
        let db = CareDb::open_in_memory().unwrap();
        db.upsert_booking(&booking(1, BookingStatus::Completed)).unwrap();
        let c = completion(&db, &booking(2, BookingStatus::Scheduled), BookingStatus::StudentAbsent)
            .await
            .unwrap();
        assert_eq!(c.count, 2);
        assert_eq!(c.counts.absent, 1);
    }
}
