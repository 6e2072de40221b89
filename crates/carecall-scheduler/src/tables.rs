//! Static trigger tables.
//!
//! Checking, observation and periodic report are indexed by the completion
//! counter. Upcoming test and test report are indexed by curriculum
//! position (`display_order + 1`), so they do not depend on enrollment size.

use carecall_core::TaskType;

/// Enrollment size band used to pick a table variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeBand {
    /// Up to 24 lessons.
    Short,
    /// 25 to 50 lessons.
    Standard,
    /// More than 50 lessons.
    Long,
}

impl SizeBand {
    pub fn of(size: u32) -> Self {
        match size {
            0..=24 => SizeBand::Short,
            25..=50 => SizeBand::Standard,
            _ => SizeBand::Long,
        }
    }
}

const CHECKING_SHORT: &[u32] = &[3];
const CHECKING_STANDARD: &[u32] = &[3, 20];
const CHECKING_LONG: &[u32] = &[3, 30, 60, 90];

const OBSERVATION: &[u32] = &[8, 20, 40, 60, 80, 100];

const UPCOMING_TEST: &[u32] = &[12, 26, 41, 56, 71, 86, 101, 116];
const TEST_REPORT: &[u32] = &[14, 28, 43, 58, 73, 88, 103, 118];

const PERIODIC_STANDARD: &[u32] = &[10, 20];
const PERIODIC_FIFTY: &[u32] = &[10, 20, 30, 40];
const PERIODIC_LONG: &[u32] = &[10, 20, 30, 40, 50, 60, 70, 80, 90];

/// Smallest enrollment that receives periodic reports.
pub const PERIODIC_MIN_SIZE: u32 = 25;

/// Sorted trigger values of `task_type` for an enrollment of `size` lessons.
/// Greeting is never triggered and has no table.
pub fn table(task_type: TaskType, size: u32) -> &'static [u32] {
    match task_type {
        TaskType::Greeting => &[],
        TaskType::Checking => match SizeBand::of(size) {
            SizeBand::Short => CHECKING_SHORT,
            SizeBand::Standard => CHECKING_STANDARD,
            SizeBand::Long => CHECKING_LONG,
        },
        TaskType::Observation => OBSERVATION,
        TaskType::UpcomingTest => UPCOMING_TEST,
        TaskType::TestReport => TEST_REPORT,
        TaskType::PeriodicReport => match size {
            0..PERIODIC_MIN_SIZE => &[],
            PERIODIC_MIN_SIZE..=49 => PERIODIC_STANDARD,
            50 => PERIODIC_FIFTY,
            _ => PERIODIC_LONG,
        },
    }
}

/// Index of `value` in `table`, exact match only.
pub fn position(table: &[u32], value: u32) -> Option<usize> {
    table.binary_search(&value).ok()
}

/// Counter value at which a periodic report becomes the end-of-term report.
pub fn end_term_threshold(size: u32) -> Option<u32> {
    match size {
        0 => None,
        1..=49 => Some(20),
        50 => Some(40),
        _ => Some(90),
    }
}
