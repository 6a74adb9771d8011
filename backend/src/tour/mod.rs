//! Tour domain module
//!
//! Contains the tour model, phase resolution from the tour window, and the
//! service that keeps stored phases in line with the clock.

mod model;
mod service;
mod status;

pub use model::*;
pub use service::{can_manage, PhaseAdvance, TourService};
pub use status::{phase_for_window, resolve_status};
