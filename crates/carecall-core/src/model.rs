//! Care task definitions: the core data model for follow-up work.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::Millis;
use crate::error::CareError;

/// Kind of customer-care follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Welcome call after activation. Created by an admin action, never triggered.
    Greeting,
    /// Mid-course checking call.
    Checking,
    /// Lesson observation by academic staff.
    Observation,
    /// Reminder sent before a curriculum test.
    UpcomingTest,
    /// Report after an end-of-segment test.
    TestReport,
    /// Periodic progress report.
    PeriodicReport,
}

impl TaskType {
    /// Types evaluated on every terminal booking event.
    pub const TRIGGERED: [TaskType; 5] = [
        TaskType::Checking,
        TaskType::Observation,
        TaskType::UpcomingTest,
        TaskType::TestReport,
        TaskType::PeriodicReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Greeting => "greeting",
            TaskType::Checking => "checking",
            TaskType::Observation => "observation",
            TaskType::UpcomingTest => "upcoming_test",
            TaskType::TestReport => "test_report",
            TaskType::PeriodicReport => "periodic_report",
        }
    }

    /// Whether creation of this type hands off a notification request.
    pub fn requires_contact(&self) -> bool {
        matches!(self, TaskType::UpcomingTest)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greeting" => Ok(TaskType::Greeting),
            "checking" => Ok(TaskType::Checking),
            "observation" => Ok(TaskType::Observation),
            "upcoming_test" => Ok(TaskType::UpcomingTest),
            "test_report" => Ok(TaskType::TestReport),
            "periodic_report" => Ok(TaskType::PeriodicReport),
            other => Err(CareError::validation(format!("unknown task type '{other}'"))),
        }
    }
}

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotDone,
    Done,
    /// Parked until the student's next lesson; promoted by reconciliation.
    WaitingNextBooking,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotDone => "not_done",
            TaskStatus::Done => "done",
            TaskStatus::WaitingNextBooking => "waiting_next_booking",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_done" => Ok(TaskStatus::NotDone),
            "done" => Ok(TaskStatus::Done),
            "waiting_next_booking" => Ok(TaskStatus::WaitingNextBooking),
            other => Err(CareError::validation(format!("unknown task status '{other}'"))),
        }
    }
}

/// Priority: low, normal, high, urgent. Only periodic reports carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(CareError::validation(format!("unknown priority '{other}'"))),
        }
    }
}

/// Sub-type computed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Mid,
    Final,
    Periodic,
    EndTerm,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Mid => "mid",
            Classification::Final => "final",
            Classification::Periodic => "periodic",
            Classification::EndTerm => "end_term",
        }
    }
}

impl FromStr for Classification {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mid" => Ok(Classification::Mid),
            "final" => Ok(Classification::Final),
            "periodic" => Ok(Classification::Periodic),
            "end_term" => Ok(Classification::EndTerm),
            other => Err(CareError::validation(format!("unknown classification '{other}'"))),
        }
    }
}

/// One checklist line on a call script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub label: String,
    #[serde(default)]
    pub checked: bool,
}

impl ChecklistItem {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            checked: false,
        }
    }
}

/// Task-type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskDetail {
    Greeting {
        checklist: Vec<ChecklistItem>,
    },
    Checking {
        checklist: Vec<ChecklistItem>,
    },
    Observation {
        teacher_id: Option<i64>,
        #[serde(default)]
        remark: Option<String>,
    },
    UpcomingTest {
        course_id: i64,
        /// Curriculum position the reminder was raised at.
        test_lesson: u32,
    },
    TestReport {
        course_id: i64,
        #[serde(default)]
        score: Option<f64>,
        #[serde(default)]
        remark: Option<String>,
    },
    PeriodicReport {
        total_completed: u32,
        total_absent: u32,
        input_level: i64,
    },
}

impl TaskDetail {
    /// The task type this payload belongs to.
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskDetail::Greeting { .. } => TaskType::Greeting,
            TaskDetail::Checking { .. } => TaskType::Checking,
            TaskDetail::Observation { .. } => TaskType::Observation,
            TaskDetail::UpcomingTest { .. } => TaskType::UpcomingTest,
            TaskDetail::TestReport { .. } => TaskType::TestReport,
            TaskDetail::PeriodicReport { .. } => TaskType::PeriodicReport,
        }
    }

    /// Default greeting call script.
    pub fn greeting() -> Self {
        TaskDetail::Greeting {
            checklist: ["Confirm schedule", "Confirm learning goal", "Introduce care staff"]
                .iter()
                .map(|l| ChecklistItem::new(l))
                .collect(),
        }
    }

    /// Default checking call script.
    pub fn checking() -> Self {
        TaskDetail::Checking {
            checklist: ["Ask about teacher", "Ask about lesson pace", "Ask about platform issues"]
                .iter()
                .map(|l| ChecklistItem::new(l))
                .collect(),
        }
    }
}

/// A staff note on a task. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub author_id: i64,
    pub body: String,
    pub created_at: Millis,
}

/// Unique key of a care task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub student_id: i64,
    pub enrollment_id: i64,
    pub task_type: TaskType,
    pub lesson_index: u32,
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}#{}",
            self.student_id, self.enrollment_id, self.task_type, self.lesson_index
        )
    }
}

/// A task ready to be inserted; the store assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCareTask {
    pub key: TaskKey,
    /// Human-facing sequential code.
    pub code: i64,
    pub status: TaskStatus,
    pub deadline: Option<Millis>,
    pub priority: Option<Priority>,
    pub sub_type: Option<Classification>,
    pub booking_id: Option<i64>,
    pub course_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub reporter_id: Option<i64>,
    pub student_name: String,
    pub student_phone: String,
    pub student_email: String,
    pub detail: TaskDetail,
}

/// A stored care task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareTask {
    /// Surrogate storage id.
    pub id: i64,
    pub code: i64,
    pub student_id: i64,
    pub enrollment_id: i64,
    pub task_type: TaskType,
    /// Trigger value at creation. Never mutated.
    pub lesson_index: u32,
    pub status: TaskStatus,
    pub deadline: Option<Millis>,
    pub priority: Option<Priority>,
    pub sub_type: Option<Classification>,
    pub booking_id: Option<i64>,
    pub course_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub reporter_id: Option<i64>,
    pub student_name: String,
    pub student_phone: String,
    pub student_email: String,
    pub detail: TaskDetail,
    pub note_history: Vec<NoteEntry>,
    pub created_at: Millis,
    pub updated_at: Millis,
}

impl CareTask {
    /// Materialize a new task with its storage id.
    pub fn from_new(id: i64, new: NewCareTask, now: Millis) -> Self {
        Self {
            id,
            code: new.code,
            student_id: new.key.student_id,
            enrollment_id: new.key.enrollment_id,
            task_type: new.key.task_type,
            lesson_index: new.key.lesson_index,
            status: new.status,
            deadline: new.deadline,
            priority: new.priority,
            sub_type: new.sub_type,
            booking_id: new.booking_id,
            course_id: new.course_id,
            staff_id: new.staff_id,
            reporter_id: new.reporter_id,
            student_name: new.student_name,
            student_phone: new.student_phone,
            student_email: new.student_email,
            detail: new.detail,
            note_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            student_id: self.student_id,
            enrollment_id: self.enrollment_id,
            task_type: self.task_type,
            lesson_index: self.lesson_index,
        }
    }
}
