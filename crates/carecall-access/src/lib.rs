//! # CareCall Access
//!
//! Who sees which care task, and what they may do with it.
//!
//! - [`OwnershipResolver`]: requester + raw staff filter → [`StaffFilter`]
//! - [`TaskQueryFacade`]: validated, role-scoped, paginated listings
//! - [`TaskActions`]: status, notes, detail edits and removal behind the
//!   same visibility check
//!
//! [`StaffFilter`]: carecall_core::StaffFilter

pub mod actions;
pub mod ownership;
pub mod query;

pub use actions::TaskActions;
pub use ownership::{OwnerColumn, OwnershipResolver, StaffSelector, VisibleSet};
pub use query::{TaskListRequest, TaskQueryFacade};
