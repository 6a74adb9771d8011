//! Payment route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/initiate", post(initiate_payment))
        .route("/api/payments/confirm", post(confirm_payment))
        .route("/api/payments/history", get(payment_history))
        .route("/api/payments/methods", get(payment_methods))
}
