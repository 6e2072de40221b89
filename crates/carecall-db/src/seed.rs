//! JSON fixtures for loading collaborator records in bulk.

use serde::{Deserialize, Serialize};
use std::path::Path;

use carecall_core::booking::{Booking, Enrollment, StudentProfile};
use carecall_core::error::Result;
use carecall_core::staff::{Department, Requester, Team};

use crate::CareDb;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureAdmin {
    pub name: String,
    #[serde(flatten)]
    pub requester: Requester,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureStudent {
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(default)]
    pub staff_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCourse {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub max_display_order: Option<u32>,
}

/// Everything the engine reads, in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub admins: Vec<FixtureAdmin>,
    #[serde(default)]
    pub students: Vec<FixtureStudent>,
    #[serde(default)]
    pub courses: Vec<FixtureCourse>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write every record; departments before teams for the foreign keys.
    pub fn apply(&self, db: &CareDb) -> Result<()> {
        for department in &self.departments {
            db.upsert_department(department)?;
        }
        for team in &self.teams {
            db.upsert_team(team)?;
        }
        for admin in &self.admins {
            db.upsert_admin(&admin.name, &admin.requester)?;
        }
        for student in &self.students {
            db.upsert_student(&student.profile, student.staff_id)?;
        }
        for course in &self.courses {
            db.upsert_course(course.id, &course.name, course.max_display_order)?;
        }
        for enrollment in &self.enrollments {
            db.upsert_enrollment(enrollment)?;
        }
        for booking in &self.bookings {
            db.upsert_booking(booking)?;
        }
        tracing::info!(
            "🌱 Fixture applied: {} departments, {} teams, {} students, {} bookings",
            self.departments.len(),
            self.teams.len(),
            self.students.len(),
            self.bookings.len()
        );
        Ok(())
    }
}
