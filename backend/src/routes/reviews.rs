//! Review route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tours/:id/reviews", get(tour_reviews).post(create_review))
        .route("/api/reviews/my", get(my_reviews))
        .route("/api/reviews/:id", axum::routing::put(update_review).delete(delete_review))
}
