//! # CareCall Scheduler
//!
//! Turns terminal booking events into care tasks, hands contact requests to
//! the notification boundary, and promotes parked tasks on an interval.
//!
//! ## Architecture
//! ```text
//! on_booking_terminal_status(booking, prev, new)
//!   ├── counter: prior terminal bookings + 1
//!   └── join_all over the five triggered types
//!         ├── tables: exact membership of the trigger value
//!         ├── guard: point lookup on the unique key
//!         ├── deadline: deadline / priority / sub-type
//!         ├── TaskStore::create (unique index → AlreadyExists)
//!         └── NotificationEmitter (upcoming test only)
//!
//! spawn_reconciler (tokio interval)
//!   └── waiting_next_booking → not_done once a later lesson exists
//! ```

pub mod counter;
pub mod deadline;
pub mod guard;
pub mod notify;
pub mod reconcile;
pub mod tables;
pub mod trigger;

pub use counter::Completion;
pub use deadline::DAY_MS;
pub use guard::IdempotencyGuard;
pub use notify::{NotificationEmitter, NotifyRouter};
pub use reconcile::{ReconcileReport, Reconciler, spawn_reconciler};
pub use trigger::{BranchOutcome, BranchReport, EventReport, TriggerEngine};
