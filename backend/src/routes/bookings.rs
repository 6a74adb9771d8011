//! Booking route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/my", get(my_bookings))
        .route("/api/bookings/:id", get(get_booking))
        .route("/api/bookings/:id/status", put(update_booking_status))
        .route("/api/bookings/:id/cancel", post(cancel_booking))
        .route("/api/bookings/:id/payment", post(record_booking_payment))
        .route("/api/bookings/:id/refund", post(refund_booking))
        .route("/api/tours/:id/bookings", get(tour_bookings))
}
