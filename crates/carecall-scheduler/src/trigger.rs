//! Task trigger engine: booking event in, per-type outcome report out.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use carecall_core::config::DepartmentConfig;
use carecall_core::traits::{CreateOutcome, SequenceCounter, StaffDirectory, StudentRecords, TaskStore};
use carecall_core::{
    Booking, BookingStatus, CareError, Classification, Millis, NewCareTask, Priority, Result,
    StudentProfile, TaskDetail, TaskKey, TaskStatus, TaskType, TeamLookup,
};

use crate::counter::{self, Completion};
use crate::deadline;
use crate::guard::IdempotencyGuard;
use crate::notify::NotificationEmitter;
use crate::tables;

/// Sequence backing the human-facing task code.
pub const TASK_CODE_SEQUENCE: &str = "care_task";

/// Result of one task-type branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum BranchOutcome {
    Created(i64),
    SkippedDuplicate,
    SkippedNoMatch,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchReport {
    pub task_type: TaskType,
    pub outcome: BranchOutcome,
}

/// Everything one booking event produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    pub booking_id: i64,
    /// Completion counter, absent when the transition was not evaluated.
    pub count: Option<u32>,
    pub branches: Vec<BranchReport>,
}

impl EventReport {
    pub fn outcome(&self, task_type: TaskType) -> Option<&BranchOutcome> {
        self.branches
            .iter()
            .find(|b| b.task_type == task_type)
            .map(|b| &b.outcome)
    }

    /// Ids of tasks created by this event.
    pub fn created(&self) -> Vec<i64> {
        self.branches
            .iter()
            .filter_map(|b| match b.outcome {
                BranchOutcome::Created(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

/// Inputs shared by every branch of one event, read once.
struct EventContext<'a> {
    booking: &'a Booking,
    completion: Completion,
    /// Enrollment size; 0 when the enrollment record is missing.
    size: u32,
    profile: StudentProfile,
    staff_id: Option<i64>,
    now: Millis,
}

/// Calculated fields of a task about to be created.
struct Plan {
    deadline: Option<Millis>,
    priority: Option<Priority>,
    sub_type: Option<Classification>,
    reporter_id: Option<i64>,
    detail: TaskDetail,
}

type Clock = Arc<dyn Fn() -> Millis + Send + Sync>;

/// Orchestrates counter, tables, guard and calculator for booking events.
#[derive(Clone)]
pub struct TriggerEngine {
    guard: IdempotencyGuard,
    records: Arc<dyn StudentRecords>,
    directory: Arc<dyn StaffDirectory>,
    sequences: Arc<dyn SequenceCounter>,
    emitter: NotificationEmitter,
    academic_code: String,
    clock: Clock,
}

impl TriggerEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        records: Arc<dyn StudentRecords>,
        directory: Arc<dyn StaffDirectory>,
        sequences: Arc<dyn SequenceCounter>,
        emitter: NotificationEmitter,
        departments: &DepartmentConfig,
    ) -> Self {
        Self {
            guard: IdempotencyGuard::new(store),
            records,
            directory,
            sequences,
            emitter,
            academic_code: departments.academic_code.clone(),
            clock: Arc::new(carecall_core::now_millis),
        }
    }

    /// Replace the wall clock (deadlines relative to "now").
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> Millis + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Evaluate every triggered task type for a booking status change.
    ///
    /// Only a transition from a non-terminal into a terminal status is
    /// evaluated; anything else returns an empty report. Branch failures are
    /// reported per type and never abort the other branches.
    pub async fn on_booking_terminal_status(
        &self,
        booking: &Booking,
        previous: BookingStatus,
        new: BookingStatus,
    ) -> Result<EventReport> {
        if !new.is_terminal() || previous.is_terminal() {
            tracing::debug!("⏭️ Booking {} {previous} → {new}: not a terminal transition", booking.id);
            return Ok(EventReport {
                booking_id: booking.id,
                count: None,
                branches: Vec::new(),
            });
        }

        let ctx = self.context(booking, new).await?;
        tracing::debug!(
            "📚 Booking {} ({new}): count {} of {} for enrollment {}",
            booking.id,
            ctx.completion.count,
            ctx.size,
            booking.enrollment_id
        );

        let branches = join_all(TaskType::TRIGGERED.iter().map(|task_type| {
            let ctx = &ctx;
            async move {
                BranchReport {
                    task_type: *task_type,
                    outcome: self.run_branch(*task_type, ctx).await,
                }
            }
        }))
        .await;

        Ok(EventReport {
            booking_id: booking.id,
            count: Some(ctx.completion.count),
            branches,
        })
    }

    /// Admin-created greeting task: lesson index 0, no deadline.
    pub async fn create_adhoc(
        &self,
        task_type: TaskType,
        student_id: i64,
        enrollment_id: i64,
    ) -> Result<BranchOutcome> {
        if task_type != TaskType::Greeting {
            return Err(CareError::validation(format!(
                "{task_type} tasks are created by booking events only"
            )));
        }
        let enrollment = self
            .records
            .enrollment(enrollment_id)
            .await?
            .ok_or_else(|| CareError::reference("enrollment", enrollment_id.to_string()))?;
        if enrollment.student_id != student_id {
            return Err(CareError::validation(format!(
                "enrollment {enrollment_id} does not belong to student {student_id}"
            )));
        }

        let key = TaskKey {
            student_id,
            enrollment_id,
            task_type,
            lesson_index: 0,
        };
        if self.guard.exists(&key).await? {
            return Ok(BranchOutcome::SkippedDuplicate);
        }
        let profile = self.profile(student_id).await?;
        let staff_id = self.directory.assigned_staff(student_id).await?;
        let code = self.sequences.next_id(TASK_CODE_SEQUENCE).await?;
        let task = NewCareTask {
            key,
            code,
            status: TaskStatus::NotDone,
            deadline: None,
            priority: None,
            sub_type: None,
            booking_id: None,
            course_id: None,
            staff_id,
            reporter_id: None,
            student_name: profile.name,
            student_phone: profile.phone,
            student_email: profile.email,
            detail: TaskDetail::greeting(),
        };
        Ok(match self.guard.create(task).await? {
            CreateOutcome::Created(task) => {
                tracing::info!("👋 Greeting task {} created for student {student_id}", task.id);
                BranchOutcome::Created(task.id)
            }
            CreateOutcome::AlreadyExists => BranchOutcome::SkippedDuplicate,
        })
    }

    async fn context<'a>(&self, booking: &'a Booking, new: BookingStatus) -> Result<EventContext<'a>> {
        let completion = counter::completion(self.records.as_ref(), booking, new).await?;
        let size = match self.records.enrollment(booking.enrollment_id).await? {
            Some(enrollment) => enrollment.original_number_class,
            None => {
                tracing::warn!("⚠️ Enrollment {} missing, treating size as 0", booking.enrollment_id);
                0
            }
        };
        let profile = self.profile(booking.student_id).await?;
        let staff_id = self.directory.assigned_staff(booking.student_id).await?;
        Ok(EventContext {
            booking,
            completion,
            size,
            profile,
            staff_id,
            now: (self.clock)(),
        })
    }

    async fn profile(&self, student_id: i64) -> Result<StudentProfile> {
        Ok(self
            .records
            .student_profile(student_id)
            .await?
            .unwrap_or_else(|| StudentProfile {
                id: student_id,
                ..Default::default()
            }))
    }

    async fn run_branch(&self, task_type: TaskType, ctx: &EventContext<'_>) -> BranchOutcome {
        match self.evaluate(task_type, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("⚠️ {task_type} branch for booking {} failed: {e}", ctx.booking.id);
                BranchOutcome::Failed(e.to_string())
            }
        }
    }

    async fn evaluate(&self, task_type: TaskType, ctx: &EventContext<'_>) -> Result<BranchOutcome> {
        let booking = ctx.booking;
        let trigger = match task_type {
            TaskType::Checking | TaskType::Observation | TaskType::PeriodicReport => ctx.completion.count,
            TaskType::UpcomingTest | TaskType::TestReport => booking.display_order + 1,
            TaskType::Greeting => return Ok(BranchOutcome::SkippedNoMatch),
        };
        let table = tables::table(task_type, ctx.size);
        if tables::position(table, trigger).is_none() {
            return Ok(BranchOutcome::SkippedNoMatch);
        }

        let key = TaskKey {
            student_id: booking.student_id,
            enrollment_id: booking.enrollment_id,
            task_type,
            lesson_index: trigger,
        };
        if self.guard.exists(&key).await? {
            tracing::debug!("🔁 {key} already exists");
            return Ok(BranchOutcome::SkippedDuplicate);
        }

        let plan = self.plan(task_type, table, trigger, ctx).await?;
        let code = self.sequences.next_id(TASK_CODE_SEQUENCE).await?;
        let task = NewCareTask {
            key,
            code,
            status: TaskStatus::NotDone,
            deadline: plan.deadline,
            priority: plan.priority,
            sub_type: plan.sub_type,
            booking_id: Some(booking.id),
            course_id: Some(booking.course_id),
            staff_id: ctx.staff_id,
            reporter_id: plan.reporter_id,
            student_name: ctx.profile.name.clone(),
            student_phone: ctx.profile.phone.clone(),
            student_email: ctx.profile.email.clone(),
            detail: plan.detail,
        };

        match self.guard.create(task).await? {
            CreateOutcome::Created(task) => {
                tracing::info!(
                    "📝 Care task {} created: {} (code {}, deadline {:?})",
                    task.id,
                    task.key(),
                    task.code,
                    task.deadline
                );
                if task_type.requires_contact() {
                    self.emitter.emit_for(&task).await;
                }
                Ok(BranchOutcome::Created(task.id))
            }
            CreateOutcome::AlreadyExists => Ok(BranchOutcome::SkippedDuplicate),
        }
    }

    async fn plan(
        &self,
        task_type: TaskType,
        table: &[u32],
        trigger: u32,
        ctx: &EventContext<'_>,
    ) -> Result<Plan> {
        let booking = ctx.booking;
        let lesson_deadline = Some(deadline::after_lesson(booking.end_time));
        let plan = match task_type {
            TaskType::Greeting => Plan {
                deadline: None,
                priority: None,
                sub_type: None,
                reporter_id: None,
                detail: TaskDetail::greeting(),
            },
            TaskType::Checking => Plan {
                deadline: lesson_deadline,
                priority: None,
                sub_type: None,
                reporter_id: None,
                detail: TaskDetail::checking(),
            },
            TaskType::Observation => Plan {
                deadline: lesson_deadline,
                priority: None,
                sub_type: Some(deadline::classify(table, trigger, Some(ctx.size))),
                reporter_id: None,
                detail: TaskDetail::Observation {
                    teacher_id: booking.teacher_id,
                    remark: None,
                },
            },
            TaskType::UpcomingTest | TaskType::TestReport => {
                let limit = self
                    .records
                    .max_display_order(booking.course_id)
                    .await?
                    .map(|max| max + 1);
                let detail = if task_type == TaskType::UpcomingTest {
                    TaskDetail::UpcomingTest {
                        course_id: booking.course_id,
                        test_lesson: trigger,
                    }
                } else {
                    TaskDetail::TestReport {
                        course_id: booking.course_id,
                        score: None,
                        remark: None,
                    }
                };
                Plan {
                    deadline: lesson_deadline,
                    priority: None,
                    sub_type: Some(deadline::classify(table, trigger, limit)),
                    reporter_id: None,
                    detail,
                }
            }
            TaskType::PeriodicReport => {
                let reporter_id = self.reporter_for(booking).await?;
                let periodic = deadline::periodic(ctx.size, trigger, ctx.now);
                Plan {
                    deadline: Some(periodic.deadline),
                    priority: Some(periodic.priority),
                    sub_type: Some(periodic.classification),
                    reporter_id,
                    detail: TaskDetail::PeriodicReport {
                        total_completed: ctx.completion.counts.completed,
                        total_absent: ctx.completion.counts.absent,
                        input_level: ctx.profile.input_level.unwrap_or(0),
                    },
                }
            }
        };
        Ok(plan)
    }

    /// Leader of the academic team the booking's teacher belongs to.
    /// A missing academic department fails the branch.
    async fn reporter_for(&self, booking: &Booking) -> Result<Option<i64>> {
        let department = self
            .directory
            .find_department_by_code(&self.academic_code)
            .await?
            .ok_or_else(|| CareError::reference("department", self.academic_code.clone()))?;
        let Some(teacher_id) = booking.teacher_id else {
            return Ok(None);
        };
        let team = self
            .directory
            .find_team(TeamLookup::containing(department.id, teacher_id))
            .await?;
        Ok(team.map(|t| t.leader_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_core::traits::{NotificationSink, TaskStore};
    use carecall_core::{Department, Enrollment, Team};
    use carecall_db::CareDb;

    use crate::notify::NotifyRouter;

    const NOW: Millis = 1_700_000_000_000;
    const HOUR_MS: Millis = 3_600_000;

    struct Harness {
        db: Arc<CareDb>,
        router: Arc<NotifyRouter>,
        engine: TriggerEngine,
    }

    fn harness(size: u32, max_display_order: Option<u32>) -> Harness {
        let db = Arc::new(CareDb::open_in_memory().unwrap());
        let router = Arc::new(NotifyRouter::new(50));
        let sink: Arc<dyn NotificationSink> = router.clone();
        let emitter =
            NotificationEmitter::from_config(&carecall_core::config::NotifyConfig::default(), sink).unwrap();
        let engine = TriggerEngine::new(
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            emitter,
            &DepartmentConfig::default(),
        )
        .with_clock(|| NOW);

        db.upsert_student(
            &StudentProfile {
                id: 1,
                name: "Nguyen Lan".into(),
                phone: "0901".into(),
                email: "lan@mail.test".into(),
                input_level: Some(4),
            },
            Some(200),
        )
        .unwrap();
        db.upsert_enrollment(&Enrollment {
            id: 10,
            student_id: 1,
            original_number_class: size,
            activation_date: None,
        })
        .unwrap();
        db.upsert_course(7, "English", max_display_order).unwrap();
        db.upsert_department(&Department {
            id: 2,
            code: "ACADEMIC".into(),
            name: "Academic".into(),
        })
        .unwrap();
        db.upsert_team(&Team {
            id: 9,
            department_id: 2,
            name: "Teachers A".into(),
            leader_id: 300,
            member_ids: vec![900],
        })
        .unwrap();

        Harness { db, router, engine }
    }

    fn booking(id: i64, display_order: u32, status: BookingStatus) -> Booking {
        Booking {
            id,
            student_id: 1,
            enrollment_id: 10,
            course_id: 7,
            display_order,
            start_time: NOW + id * HOUR_MS,
            end_time: NOW + id * HOUR_MS + HOUR_MS / 2,
            teacher_id: Some(900),
            status,
        }
    }

    /// Seed `done` terminal lessons ahead of the booking under test.
    fn seed_history(db: &CareDb, done: u32) {
        for i in 0..done {
            db.upsert_booking(&booking(1_000 + i64::from(i), 200 + i, BookingStatus::Completed))
                .unwrap();
        }
    }

    async fn complete(h: &Harness, b: &Booking) -> EventReport {
        h.engine
            .on_booking_terminal_status(b, BookingStatus::Scheduled, BookingStatus::Completed)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_replay_creates_once() {
        let h = harness(60, Some(40));
        seed_history(&h.db, 2);
        let b = booking(1, 11, BookingStatus::Scheduled);

        let first = complete(&h, &b).await;
        assert_eq!(first.count, Some(3));
        assert!(matches!(first.outcome(TaskType::Checking), Some(BranchOutcome::Created(_))));
        assert!(matches!(first.outcome(TaskType::UpcomingTest), Some(BranchOutcome::Created(_))));

        for _ in 0..3 {
            let replay = complete(&h, &b).await;
            assert!(replay.created().is_empty());
            assert_eq!(replay.outcome(TaskType::Checking), Some(&BranchOutcome::SkippedDuplicate));
            assert_eq!(replay.outcome(TaskType::UpcomingTest), Some(&BranchOutcome::SkippedDuplicate));
        }

        let page = h.db.query(&Default::default()).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        // Only the upcoming test contacts the student, once per channel.
        assert_eq!(h.router.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_replay_creates_once() {
        let h = harness(60, Some(40));
        seed_history(&h.db, 2);
        let b = booking(1, 11, BookingStatus::Scheduled);

        let reports = join_all((0..5).map(|_| complete(&h, &b))).await;
        let created: usize = reports.iter().map(|r| r.created().len()).sum();
        assert_eq!(created, 2);
    }

    #[tokio::test]
    async fn test_second_booking_at_same_lesson_is_duplicate() {
        for (display_order, task_type) in [(11, TaskType::UpcomingTest), (13, TaskType::TestReport)] {
            let h = harness(60, Some(40));
            let first = booking(1, display_order, BookingStatus::Completed);
            h.db.upsert_booking(&first).unwrap();
            let report = complete(&h, &first).await;
            assert_eq!(report.count, Some(1));
            assert!(matches!(report.outcome(task_type), Some(BranchOutcome::Created(_))));

            // Makeup lesson for the same curriculum position
            let makeup = booking(2, display_order, BookingStatus::Completed);
            h.db.upsert_booking(&makeup).unwrap();
            let report = complete(&h, &makeup).await;
            assert_eq!(report.count, Some(2));
            assert_eq!(report.outcome(task_type), Some(&BranchOutcome::SkippedDuplicate));

            let page = h
                .db
                .query(&carecall_core::TaskQuery {
                    task_type: Some(task_type),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(page.pagination.total, 1);
            assert_eq!(page.data[0].booking_id, Some(1));
        }
    }

    #[tokio::test]
    async fn test_checking_only_at_table_entries() {
        for (done, expected) in [(0, false), (1, false), (2, true), (3, false)] {
            let h = harness(60, None);
            seed_history(&h.db, done);
            let report = complete(&h, &booking(1, 0, BookingStatus::Scheduled)).await;
            let count = done + 1;
            assert_eq!(report.count, Some(count));
            let created = matches!(report.outcome(TaskType::Checking), Some(BranchOutcome::Created(_)));
            assert_eq!(created, expected, "count {count}");
            if expected {
                let key = TaskKey {
                    student_id: 1,
                    enrollment_id: 10,
                    task_type: TaskType::Checking,
                    lesson_index: 3,
                };
                let task = h.db.find_by_key(&key).await.unwrap().unwrap();
                assert_eq!(task.staff_id, Some(200));
                assert_eq!(task.student_name, "Nguyen Lan");
                assert_eq!(task.deadline, Some(booking(1, 0, BookingStatus::Scheduled).end_time + deadline::DAY_MS));
            }
        }
    }

    #[tokio::test]
    async fn test_absent_counts_as_terminal() {
        let h = harness(60, None);
        seed_history(&h.db, 2);
        let report = h
            .engine
            .on_booking_terminal_status(
                &booking(1, 0, BookingStatus::Scheduled),
                BookingStatus::Scheduled,
                BookingStatus::StudentAbsent,
            )
            .await
            .unwrap();
        assert!(matches!(report.outcome(TaskType::Checking), Some(BranchOutcome::Created(_))));
    }

    #[tokio::test]
    async fn test_non_terminal_transitions_ignored() {
        let h = harness(60, None);
        seed_history(&h.db, 2);
        let b = booking(1, 0, BookingStatus::Scheduled);
        let cancelled = h
            .engine
            .on_booking_terminal_status(&b, BookingStatus::Scheduled, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(cancelled.branches.is_empty());
        let flip = h
            .engine
            .on_booking_terminal_status(&b, BookingStatus::StudentAbsent, BookingStatus::Completed)
            .await
            .unwrap();
        assert_eq!(flip.count, None);
    }

    #[tokio::test]
    async fn test_upcoming_test_final_vs_mid() {
        // display order 11 → trigger 12
        let short = harness(30, Some(12));
        complete(&short, &booking(1, 11, BookingStatus::Scheduled)).await;
        let key = TaskKey {
            student_id: 1,
            enrollment_id: 10,
            task_type: TaskType::UpcomingTest,
            lesson_index: 12,
        };
        let task = short.db.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(task.sub_type, Some(Classification::Final));
        assert_eq!(
            task.detail,
            TaskDetail::UpcomingTest {
                course_id: 7,
                test_lesson: 12
            }
        );

        let long = harness(60, Some(40));
        complete(&long, &booking(1, 11, BookingStatus::Scheduled)).await;
        let task = long.db.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(task.sub_type, Some(Classification::Mid));

        let unknown = harness(60, None);
        complete(&unknown, &booking(1, 11, BookingStatus::Scheduled)).await;
        let task = unknown.db.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(task.sub_type, Some(Classification::Mid));
    }

    #[tokio::test]
    async fn test_periodic_end_term_by_size() {
        let periodic_key = TaskKey {
            student_id: 1,
            enrollment_id: 10,
            task_type: TaskType::PeriodicReport,
            lesson_index: 20,
        };

        let small = harness(45, None);
        seed_history(&small.db, 19);
        complete(&small, &booking(1, 0, BookingStatus::Scheduled)).await;
        let task = small.db.find_by_key(&periodic_key).await.unwrap().unwrap();
        assert_eq!(task.sub_type, Some(Classification::EndTerm));
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.deadline, Some(NOW + 5 * deadline::DAY_MS));
        assert_eq!(task.reporter_id, Some(300));
        assert_eq!(
            task.detail,
            TaskDetail::PeriodicReport {
                total_completed: 20,
                total_absent: 0,
                input_level: 4
            }
        );

        let large = harness(80, None);
        seed_history(&large.db, 19);
        complete(&large, &booking(1, 0, BookingStatus::Scheduled)).await;
        let task = large.db.find_by_key(&periodic_key).await.unwrap().unwrap();
        assert_eq!(task.sub_type, Some(Classification::Periodic));
        assert_eq!(task.priority, Some(Priority::Normal));
        assert_eq!(task.deadline, Some(NOW + 3 * deadline::DAY_MS));
    }

    #[tokio::test]
    async fn test_missing_academic_department_fails_branch_only() {
        let h = harness(45, None);
        // Rename the academic department so the lookup misses.
        h.db.upsert_department(&Department {
            id: 2,
            code: "OTHER".into(),
            name: "Other".into(),
        })
        .unwrap();
        seed_history(&h.db, 19);
        let report = complete(&h, &booking(1, 0, BookingStatus::Scheduled)).await;
        match report.outcome(TaskType::PeriodicReport) {
            Some(BranchOutcome::Failed(reason)) => assert!(reason.contains("ACADEMIC")),
            other => panic!("expected failure, got {other:?}"),
        }
        // count 20 on a 45-lesson enrollment also hits checking and observation
        assert!(matches!(report.outcome(TaskType::Checking), Some(BranchOutcome::Created(_))));
        assert!(matches!(report.outcome(TaskType::Observation), Some(BranchOutcome::Created(_))));
        assert_eq!(report.branches.len(), 5);
    }

    #[tokio::test]
    async fn test_adhoc_greeting() {
        let h = harness(30, None);
        let first = h.engine.create_adhoc(TaskType::Greeting, 1, 10).await.unwrap();
        let BranchOutcome::Created(id) = first else {
            panic!("expected creation, got {first:?}");
        };
        let task = h.db.find(id).await.unwrap().unwrap();
        assert_eq!(task.lesson_index, 0);
        assert_eq!(task.deadline, None);
        assert_eq!(task.staff_id, Some(200));

        assert_eq!(
            h.engine.create_adhoc(TaskType::Greeting, 1, 10).await.unwrap(),
            BranchOutcome::SkippedDuplicate
        );
        assert!(h.engine.create_adhoc(TaskType::Checking, 1, 10).await.is_err());
        assert!(matches!(
            h.engine.create_adhoc(TaskType::Greeting, 1, 99).await,
            Err(CareError::Reference { .. })
        ));
    }

    #[tokio::test]
    async fn test_task_codes_are_sequential() {
        let h = harness(60, Some(40));
        seed_history(&h.db, 2);
        let report = complete(&h, &booking(1, 11, BookingStatus::Scheduled)).await;
        let mut codes = Vec::new();
        for id in report.created() {
            codes.push(h.db.find(id).await.unwrap().unwrap().code);
        }
        codes.sort();
        assert_eq!(codes, vec![1, 2]);
    }
}
