//! PostgreSQL pool for the booking store
//!
//! The schema ships inside the binary and is brought up to date at startup.
//! Health probes read the `bookings` table so a reachable database without
//! the booking schema is still reported as unhealthy.

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

/// Booking schema migrations embedded from `migrations/`
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),
}

/// Open the pool backing `PgStore`
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        database = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to booking database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    tracing::info!(pool_size = pool.size(), "Booking database pool ready");
    Ok(pool)
}

/// Apply pending booking schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    let known = MIGRATOR.iter().count();
    tracing::info!(known, "Applying booking schema migrations");

    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    tracing::info!(known, "Booking schema up to date");
    Ok(())
}

/// Probe the pool and the booking schema
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1 FROM bookings LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::HealthCheckError(e.to_string()))?;

    Ok(())
}
