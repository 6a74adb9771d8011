//! Background reconciliation of tour phases and booking states
//!
//! The [`Reconciler`] owns the three duties; [`start_scheduler`] wires them
//! to cron schedules and a delayed startup run.

mod jobs;
mod reconciler;

pub use jobs::{start_scheduler, SchedulerError, SchedulerSettings};
pub use reconciler::{Duty, DutyOutcome, Reconciler, TickReport};
