//! Deadline, priority and sub-type calculation.

use carecall_core::{Classification, Millis, Priority};

use crate::tables;

/// One day in epoch milliseconds.
pub const DAY_MS: Millis = 86_400_000;

/// Lesson-linked deadline: one day after the lesson ended.
pub fn after_lesson(end_time: Millis) -> Millis {
    end_time + DAY_MS
}

/// `Final` when `trigger` is the last reachable entry of `table`.
///
/// `limit` is the last reachable trigger value (max display order + 1 for
/// curriculum tables, enrollment size for observation). An unknown or zero
/// limit classifies as `Mid`.
pub fn classify(table: &[u32], trigger: u32, limit: Option<u32>) -> Classification {
    let Some(limit) = limit.filter(|l| *l > 0) else {
        return Classification::Mid;
    };
    let Some(index) = tables::position(table, trigger) else {
        return Classification::Mid;
    };
    match table.get(index + 1) {
        None => Classification::Final,
        Some(next) if *next > limit => Classification::Final,
        Some(_) => Classification::Mid,
    }
}

/// Periodic report scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicPlan {
    pub classification: Classification,
    pub priority: Priority,
    pub deadline: Millis,
}

/// End-of-term when the counter hits the size threshold, otherwise a
/// regular periodic report.
pub fn periodic(size: u32, trigger: u32, now: Millis) -> PeriodicPlan {
    if tables::end_term_threshold(size) == Some(trigger) {
        PeriodicPlan {
            classification: Classification::EndTerm,
            priority: Priority::High,
            deadline: now + 5 * DAY_MS,
        }
    } else {
        PeriodicPlan {
            classification: Classification::Periodic,
            priority: Priority::Normal,
            deadline: now + 3 * DAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_core::TaskType;

    const NOW: Millis = 1_700_000_000_000;

    #[test]
    fn test_upcoming_test_final_when_course_ends() {
        let table = tables::table(TaskType::UpcomingTest, 0);
        // max display order 12 → limit 13, next entry 26 is out of reach
        assert_eq!(classify(table, 12, Some(13)), Classification::Final);
        // a longer course reaches 26
        assert_eq!(classify(table, 12, Some(41)), Classification::Mid);
        assert_eq!(classify(table, 12, Some(26)), Classification::Mid);
    }

    #[test]
    fn test_unknown_limit_is_mid() {
        let table = tables::table(TaskType::TestReport, 0);
        assert_eq!(classify(table, 118, None), Classification::Mid);
        assert_eq!(classify(table, 14, Some(0)), Classification::Mid);
    }

    #[test]
    fn test_last_entry_is_final() {
        let table = tables::table(TaskType::Observation, 120);
        assert_eq!(classify(table, 100, Some(120)), Classification::Final);
        assert_eq!(classify(table, 40, Some(45)), Classification::Final);
        assert_eq!(classify(table, 40, Some(60)), Classification::Mid);
    }

    #[test]
    fn test_periodic_end_term_by_size() {
        let short = periodic(45, 20, NOW);
        assert_eq!(short.classification, Classification::EndTerm);
        assert_eq!(short.priority, Priority::High);
        assert_eq!(short.deadline, NOW + 5 * DAY_MS);

        let long = periodic(80, 20, NOW);
        assert_eq!(long.classification, Classification::Periodic);
        assert_eq!(long.priority, Priority::Normal);
        assert_eq!(long.deadline, NOW + 3 * DAY_MS);

        assert_eq!(periodic(50, 40, NOW).classification, Classification::EndTerm);
        assert_eq!(periodic(80, 90, NOW).classification, Classification::EndTerm);
    }

    #[test]
    fn test_after_lesson() {
        assert_eq!(after_lesson(1_000), 1_000 + 86_400_000);
    }
}
