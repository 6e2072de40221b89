//! Collaborator seams. The engine only talks to storage, student records,
//! the staff directory and the notification boundary through these traits.

pub mod directory;
pub mod notify;
pub mod records;
pub mod store;

pub use directory::{SequenceCounter, StaffDirectory};
pub use notify::{NotificationRequest, NotificationSink, NotifyChannel};
pub use records::StudentRecords;
pub use store::{CreateOutcome, TaskStore};
