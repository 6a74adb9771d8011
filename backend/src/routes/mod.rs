//! Route definitions for the Beyond The Map API

mod bookings;
mod nfts;
mod payments;
mod reviews;
mod tours;

pub use bookings::booking_routes;
pub use nfts::nft_routes;
pub use payments::payment_routes;
pub use reviews::review_routes;
pub use tours::tour_routes;

use axum::{routing::get, Router};

use crate::handlers::{health_check, root};
use crate::middleware;
use crate::state::AppState;

/// Full API router with request tracing and security headers
///
/// CORS and HSTS depend on deployment settings and are layered by the binary.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .merge(tour_routes())
        .merge(booking_routes())
        .merge(payment_routes())
        .merge(review_routes())
        .merge(nft_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}
