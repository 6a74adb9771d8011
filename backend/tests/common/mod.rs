//! Shared harness: in-memory store, manual clock and wired services
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use beyondthemap_server::auth::JwtAuth;
use beyondthemap_server::booking::{Booking, CreateBookingRequest, PaymentMethod};
use beyondthemap_server::clock::{Clock, ManualClock};
use beyondthemap_server::error::CoreResult;
use beyondthemap_server::events::EventBus;
use beyondthemap_server::models::{Caller, UserRole};
use beyondthemap_server::payment::{ConfirmPaymentRequest, SimulatedCardGateway};
use beyondthemap_server::scheduler::Reconciler;
use beyondthemap_server::state::AppState;
use beyondthemap_server::nft::Nft;
use beyondthemap_server::review::Review;
use beyondthemap_server::store::{
    BookingFilter, BookingPatch, InMemoryStore, ReviewFilter, ReviewPatch, Store, StoreError,
    StoreResult, TourFilter, TourPatch,
};
use beyondthemap_server::tour::{CreateTourRequest, Tour};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const VALID_CARD: &str = "4242 4242 4242 4242";
pub const DECLINED_CARD: &str = "4000000000000002";
pub const UNREACHABLE_CARD: &str = "4000000000000127";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

pub fn agency() -> Caller {
    Caller::user(Uuid::new_v4(), UserRole::Agency)
}

pub fn traveller() -> Caller {
    Caller::user(Uuid::new_v4(), UserRole::User)
}

pub fn admin() -> Caller {
    Caller::user(Uuid::new_v4(), UserRole::Admin)
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: ManualClock,
    pub events: EventBus,
    pub state: AppState,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::over(store.clone(), store)
    }

    /// Services wired to `shared_store`, with `store` as the backing rows
    pub fn over(store: Arc<InMemoryStore>, shared_store: Arc<dyn Store>) -> Self {
        let clock = ManualClock::new(start_time());
        let events = EventBus::default();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

        let state = AppState::new(
            shared_store,
            shared_clock.clone(),
            Arc::new(SimulatedCardGateway),
            events.clone(),
            JwtAuth::new(JWT_SECRET),
            "MAD".to_string(),
        );
        let reconciler = Reconciler::new(
            state.tour_service.as_ref().clone(),
            state.booking_service.as_ref().clone(),
            shared_clock,
            Duration::hours(24),
        );

        Self {
            store,
            clock,
            events,
            state,
            reconciler,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Tour starting `starts_in` from now and lasting `length`
    pub async fn tour(&self, owner: &Caller, starts_in: Duration, length: Duration) -> Tour {
        let start = self.now() + starts_in;
        self.state
            .tour_service
            .create_tour(
                owner,
                CreateTourRequest {
                    name: "Atlas Mountains Trek".to_string(),
                    location: "Imlil".to_string(),
                    price: 450,
                    max_participants: 8,
                    start_date: Some(start),
                    end_date: Some(start + length),
                },
            )
            .await
            .unwrap()
    }

    pub fn booking_request(&self, tour_id: Uuid, booking_date: DateTime<Utc>) -> CreateBookingRequest {
        CreateBookingRequest {
            tour_id,
            booking_date,
            number_of_participants: 2,
            payment_method: PaymentMethod::Fiat,
            special_requests: None,
            email: None,
            customer_name: None,
        }
    }

    pub async fn booking(&self, caller: &Caller, tour_id: Uuid, booking_date: DateTime<Utc>) -> Booking {
        self.state
            .booking_service
            .create_booking(caller, self.booking_request(tour_id, booking_date))
            .await
            .unwrap()
    }

    pub async fn pay(&self, caller: &Caller, booking_id: Uuid, card: &str) -> CoreResult<Booking> {
        self.state
            .payment_service
            .confirm_payment(caller, card_request(booking_id, card))
            .await
    }

    pub async fn stored_booking(&self, booking_id: Uuid) -> Booking {
        self.store.get_booking(booking_id).await.unwrap().unwrap()
    }

    pub async fn stored_tour(&self, tour_id: Uuid) -> Tour {
        self.store.get_tour(tour_id).await.unwrap().unwrap()
    }

    /// Confirmed booking paid by card, dated a quarter hour into its tour
    pub async fn paid_booking(&self, caller: &Caller, tour: &Tour) -> Booking {
        let start = tour.start_date.unwrap();
        let booking = self.booking(caller, tour.id, start + Duration::minutes(15)).await;
        self.pay(caller, booking.id, VALID_CARD).await.unwrap()
    }
}

pub fn card_request(booking_id: Uuid, card: &str) -> ConfirmPaymentRequest {
    ConfirmPaymentRequest {
        booking_id,
        card_number: Some(card.to_string()),
        cardholder_name: Some("Yasmine Benali".to_string()),
        expiry_date: Some("09/29".to_string()),
        cvv: Some("321".to_string()),
        payment_gateway: "card".to_string(),
        email: None,
    }
}

/// Store over an `InMemoryStore` that can fail set-based tour updates and
/// rewrite a booking right before each guarded booking write
pub struct MeddlingStore {
    inner: Arc<InMemoryStore>,
    fail_tour_updates: AtomicBool,
    booking_rewrites: Mutex<VecDeque<BookingPatch>>,
}

impl MeddlingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            fail_tour_updates: AtomicBool::new(false),
            booking_rewrites: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_tour_updates(&self) {
        self.fail_tour_updates.store(true, Ordering::SeqCst);
    }

    /// Queue unconditional writes, one applied before each guarded booking write
    pub fn rewrite_booking_before_writes(&self, patches: impl IntoIterator<Item = BookingPatch>) {
        self.booking_rewrites.lock().extend(patches);
    }
}

#[async_trait]
impl Store for MeddlingStore {
    async fn insert_tour(&self, tour: &Tour) -> StoreResult<Tour> {
        self.inner.insert_tour(tour).await
    }

    async fn get_tour(&self, id: Uuid) -> StoreResult<Option<Tour>> {
        self.inner.get_tour(id).await
    }

    async fn find_tours(&self, filter: &TourFilter) -> StoreResult<Vec<Tour>> {
        self.inner.find_tours(filter).await
    }

    async fn update_tour(
        &self,
        id: Uuid,
        guard: &TourFilter,
        patch: &TourPatch,
    ) -> StoreResult<Option<Tour>> {
        self.inner.update_tour(id, guard, patch).await
    }

    async fn update_tours(&self, filter: &TourFilter, patch: &TourPatch) -> StoreResult<Vec<Tour>> {
        if self.fail_tour_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("tours table unavailable".to_string()));
        }
        self.inner.update_tours(filter, patch).await
    }

    async fn refresh_tour_rating(
        &self,
        tour_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Tour>> {
        self.inner.refresh_tour_rating(tour_id, at).await
    }

    async fn insert_booking(&self, booking: &Booking) -> StoreResult<Booking> {
        self.inner.insert_booking(booking).await
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.inner.get_booking(id).await
    }

    async fn find_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        self.inner.find_bookings(filter).await
    }

    async fn update_booking(
        &self,
        id: Uuid,
        guard: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Option<Booking>> {
        let rewrite = self.booking_rewrites.lock().pop_front();
        if let Some(rewrite) = rewrite {
            self.inner
                .update_booking(id, &BookingFilter::new(), &rewrite)
                .await?;
        }
        self.inner.update_booking(id, guard, patch).await
    }

    async fn update_bookings(
        &self,
        filter: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Vec<Booking>> {
        self.inner.update_bookings(filter, patch).await
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<Review> {
        self.inner.insert_review(review).await
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        self.inner.get_review(id).await
    }

    async fn find_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        self.inner.find_reviews(filter).await
    }

    async fn update_review(&self, id: Uuid, patch: &ReviewPatch) -> StoreResult<Option<Review>> {
        self.inner.update_review(id, patch).await
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_review(id).await
    }

    async fn insert_nft(&self, nft: &Nft) -> StoreResult<Nft> {
        self.inner.insert_nft(nft).await
    }

    async fn get_nft(&self, id: Uuid) -> StoreResult<Option<Nft>> {
        self.inner.get_nft(id).await
    }

    async fn find_nfts(&self, owner_id: Uuid) -> StoreResult<Vec<Nft>> {
        self.inner.find_nfts(owner_id).await
    }
}

/// Harness whose services write through a `MeddlingStore`
pub fn meddled_harness() -> (Harness, Arc<MeddlingStore>) {
    let rows = Arc::new(InMemoryStore::new());
    let meddling = Arc::new(MeddlingStore::new(rows.clone()));
    (Harness::over(rows, meddling.clone()), meddling)
}
