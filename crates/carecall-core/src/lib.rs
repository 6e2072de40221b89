//! # CareCall Core
//!
//! Shared vocabulary for the care-task engine: the task model, the staff
//! hierarchy, booking inputs, query filters, configuration, and the traits
//! every collaborator (storage, student records, staff directory,
//! notification sink) implements.
//!
//! ## Architecture
//! ```text
//! carecall-core        model + traits (this crate)
//!   ├── carecall-db         SQLite implementation of the traits
//!   ├── carecall-scheduler  booking event → care tasks
//!   └── carecall-access     ownership resolver + query façade
//! ```

pub mod booking;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod staff;
pub mod traits;

pub use booking::{Booking, BookingStatus, Enrollment, StudentProfile, TerminalCounts};
pub use config::CareConfig;
pub use error::{CareError, Result};
pub use filter::{DateField, DateRange, OwnerScope, Page, SortDirection, StaffFilter, TaskQuery};
pub use model::{
    CareTask, Classification, NewCareTask, NoteEntry, Priority, TaskDetail, TaskKey, TaskStatus,
    TaskType,
};
pub use staff::{Department, Requester, Role, Team, TeamLookup};

/// Epoch milliseconds: the unit for every timestamp and deadline.
pub type Millis = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}
