//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::JwtAuth;
use crate::booking::BookingService;
use crate::clock::Clock;
use crate::events::EventBus;
use crate::nft::NftService;
use crate::payment::{PaymentGateway, PaymentService};
use crate::review::ReviewService;
use crate::store::Store;
use crate::tour::TourService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tour_service: Arc<TourService>,
    pub booking_service: Arc<BookingService>,
    pub payment_service: Arc<PaymentService>,
    pub review_service: Arc<ReviewService>,
    pub nft_service: Arc<NftService>,
    pub jwt_auth: Arc<JwtAuth>,
    pub events: EventBus,
    /// Only set when backed by PostgreSQL; drives the health probe
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Wire every service over one store, clock and event bus
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn PaymentGateway>,
        events: EventBus,
        jwt_auth: JwtAuth,
        payment_currency: String,
    ) -> Self {
        let tours = TourService::new(store.clone(), clock.clone(), events.clone());
        let bookings = BookingService::new(store.clone(), clock.clone(), events.clone());
        let payments = PaymentService::new(
            store.clone(),
            bookings.clone(),
            gateway,
            clock.clone(),
            payment_currency,
        );
        let reviews = ReviewService::new(store.clone(), clock.clone(), events.clone());
        let nfts = NftService::new(store, clock, events.clone());

        Self {
            tour_service: Arc::new(tours),
            booking_service: Arc::new(bookings),
            payment_service: Arc::new(payments),
            review_service: Arc::new(reviews),
            nft_service: Arc::new(nfts),
            jwt_auth: Arc::new(jwt_auth),
            events,
            db_pool: None,
        }
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}

impl FromRef<AppState> for EventBus {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.events.clone()
    }
}

impl FromRef<AppState> for Arc<TourService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tour_service.clone()
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.booking_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReviewService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.review_service.clone()
    }
}

impl FromRef<AppState> for Arc<NftService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.nft_service.clone()
    }
}

impl FromRef<AppState> for Arc<JwtAuth> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt_auth.clone()
    }
}
