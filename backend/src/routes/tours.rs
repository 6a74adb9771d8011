//! Tour route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn tour_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tours", get(list_tours).post(create_tour))
        .route("/api/tours/:id", get(get_tour).put(update_tour))
        .route("/api/tours/:id/cancel", post(cancel_tour))
}
