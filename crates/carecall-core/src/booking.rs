//! Read-only inputs owned by the booking and student-record subsystems.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Millis;
use crate::error::CareError;

/// Lifecycle status of a booked lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    StudentAbsent,
    TeacherAbsent,
    Cancelled,
}

impl BookingStatus {
    /// Completed or student-absent: the lesson is consumed and will not recur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::StudentAbsent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Completed => "completed",
            BookingStatus::StudentAbsent => "student_absent",
            BookingStatus::TeacherAbsent => "teacher_absent",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(BookingStatus::Scheduled),
            "completed" => Ok(BookingStatus::Completed),
            "student_absent" => Ok(BookingStatus::StudentAbsent),
            "teacher_absent" => Ok(BookingStatus::TeacherAbsent),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CareError::validation(format!("unknown booking status '{other}'"))),
        }
    }
}

/// One booked lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub student_id: i64,
    pub enrollment_id: i64,
    pub course_id: i64,
    /// Zero-based position of the unit inside the course curriculum.
    pub display_order: u32,
    pub start_time: Millis,
    pub end_time: Millis,
    #[serde(default)]
    pub teacher_id: Option<i64>,
    pub status: BookingStatus,
}

/// A purchased block of lessons (ordered package).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    /// Enrollment size; selects lookup table variants.
    pub original_number_class: u32,
    #[serde(default)]
    pub activation_date: Option<Millis>,
}

/// Denormalized student fields copied onto each task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// Level from the latest customer-care record, if any.
    #[serde(default)]
    pub input_level: Option<i64>,
}

/// Terminal bookings of an enrollment, split by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerminalCounts {
    pub completed: u32,
    pub absent: u32,
}

impl TerminalCounts {
    pub fn total(&self) -> u32 {
        self.completed + self.absent
    }

    /// Counts with one more booking of `status` applied.
    pub fn with(mut self, status: BookingStatus) -> Self {
        match status {
            BookingStatus::Completed => self.completed += 1,
            BookingStatus::StudentAbsent => self.absent += 1,
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::StudentAbsent.is_terminal());
        assert!(!BookingStatus::TeacherAbsent.is_terminal());
        assert!(!BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Scheduled.is_terminal());
    }

    #[test]
    fn test_counts_with_status() {
        let counts = TerminalCounts { completed: 4, absent: 1 };
        assert_eq!(counts.with(BookingStatus::StudentAbsent).absent, 2);
        assert_eq!(counts.with(BookingStatus::Completed).total(), 6);
        assert_eq!(counts.with(BookingStatus::Cancelled), counts);
    }
}
