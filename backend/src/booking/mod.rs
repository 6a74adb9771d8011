//! Booking domain module
//!
//! Contains the booking model, the pure state machine and the service that
//! turns transitions into guarded writes.

mod model;
mod service;
pub mod state;

pub use model::*;
pub use service::BookingService;
pub use state::Settlement;
