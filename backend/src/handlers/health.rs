//! Root and health endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::db;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub version: &'static str,
}

pub async fn root() -> &'static str {
    "Beyond The Map API Server"
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.db_pool {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => "connected".to_string(),
            Err(e) => format!("error: {}", e),
        },
        None => "in-memory".to_string(),
    };

    let (code, status) = if database.starts_with("error") {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
