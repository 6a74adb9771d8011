//! Beyond The Map Backend Server
//!
//! HTTP API for tours, bookings, payments, reviews and NFT records, plus the
//! background reconciliation scheduler.

use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use beyondthemap_server::auth::JwtAuth;
use beyondthemap_server::clock::{Clock, SystemClock};
use beyondthemap_server::config::Config;
use beyondthemap_server::db;
use beyondthemap_server::events::{log_events, EventBus};
use beyondthemap_server::middleware;
use beyondthemap_server::payment::SimulatedCardGateway;
use beyondthemap_server::routes;
use beyondthemap_server::scheduler::{start_scheduler, Reconciler, SchedulerSettings};
use beyondthemap_server::state::AppState;
use beyondthemap_server::store::{PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting Beyond The Map API");

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let events = EventBus::default();
    tokio::spawn(log_events(events.subscribe()));

    let app_state = AppState::new(
        store,
        clock.clone(),
        Arc::new(SimulatedCardGateway),
        events,
        JwtAuth::new(config.jwt_secret.clone()),
        config.payment_currency.clone(),
    )
    .with_db_pool(pool);

    let mut scheduler = if config.scheduler_enabled {
        let reconciler = Reconciler::new(
            app_state.tour_service.as_ref().clone(),
            app_state.booking_service.as_ref().clone(),
            clock,
            chrono::Duration::hours(config.stale_booking_hours),
        );
        Some(start_scheduler(reconciler, SchedulerSettings::from_config(&config)).await?)
    } else {
        tracing::warn!("Reconciliation scheduler disabled");
        None
    };

    let mut app = routes::create_router(app_state).layer(configure_cors(&config));
    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/api/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sched) = scheduler.as_mut() {
        if let Err(e) = sched.shutdown().await {
            tracing::error!(error = ?e, "Failed to stop the reconciliation scheduler");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
