//! Entity store for tours, bookings, reviews and NFT records
//!
//! Every state-machine write goes through a guarded update: the row is only
//! changed when it still matches the guard filter, and `None` comes back when
//! it no longer does. Set-based updates return the rows they changed so the
//! caller can log and publish them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, FiatPayment, PaymentMethod, PaymentStatus};
use crate::nft::Nft;
use crate::review::Review;
use crate::tour::{Tour, TourSchedule, TourStatus};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Storage failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_tour(&self, tour: &Tour) -> StoreResult<Tour>;
    async fn get_tour(&self, id: Uuid) -> StoreResult<Option<Tour>>;
    async fn find_tours(&self, filter: &TourFilter) -> StoreResult<Vec<Tour>>;
    /// Apply `patch` to the tour when it still matches `guard`
    async fn update_tour(
        &self,
        id: Uuid,
        guard: &TourFilter,
        patch: &TourPatch,
    ) -> StoreResult<Option<Tour>>;
    async fn update_tours(&self, filter: &TourFilter, patch: &TourPatch)
        -> StoreResult<Vec<Tour>>;
    /// Recompute `rating` and `review_count` from the tour's reviews
    async fn refresh_tour_rating(
        &self,
        tour_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Tour>>;

    async fn insert_booking(&self, booking: &Booking) -> StoreResult<Booking>;
    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    async fn find_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;
    /// Apply `patch` to the booking when it still matches `guard`
    async fn update_booking(
        &self,
        id: Uuid,
        guard: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Option<Booking>>;
    async fn update_bookings(
        &self,
        filter: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Vec<Booking>>;

    async fn insert_review(&self, review: &Review) -> StoreResult<Review>;
    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>>;
    async fn find_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>>;
    async fn update_review(&self, id: Uuid, patch: &ReviewPatch) -> StoreResult<Option<Review>>;
    async fn delete_review(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_nft(&self, nft: &Nft) -> StoreResult<Nft>;
    async fn get_nft(&self, id: Uuid) -> StoreResult<Option<Nft>>;
    async fn find_nfts(&self, owner_id: Uuid) -> StoreResult<Vec<Nft>>;
}

/// Tour predicate
///
/// Date predicates never match an undated tour.
#[derive(Debug, Clone, Default)]
pub struct TourFilter {
    pub statuses: Option<Vec<TourStatus>>,
    pub is_active: Option<bool>,
    pub agency_id: Option<Uuid>,
    pub starts_at_or_before: Option<DateTime<Utc>>,
    pub ends_at_or_after: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
    pub starts_after: Option<DateTime<Utc>>,
}

impl TourFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(mut self, statuses: impl Into<Vec<TourStatus>>) -> Self {
        self.statuses = Some(statuses.into());
        self
    }

    pub fn status(self, status: TourStatus) -> Self {
        self.statuses(vec![status])
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn agency(mut self, agency_id: Uuid) -> Self {
        self.agency_id = Some(agency_id);
        self
    }

    pub fn starts_at_or_before(mut self, at: DateTime<Utc>) -> Self {
        self.starts_at_or_before = Some(at);
        self
    }

    pub fn ends_at_or_after(mut self, at: DateTime<Utc>) -> Self {
        self.ends_at_or_after = Some(at);
        self
    }

    pub fn ends_before(mut self, at: DateTime<Utc>) -> Self {
        self.ends_before = Some(at);
        self
    }

    pub fn starts_after(mut self, at: DateTime<Utc>) -> Self {
        self.starts_after = Some(at);
        self
    }

    pub fn matches(&self, tour: &Tour) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&tour.tour_status) {
                return false;
            }
        }
        if self.is_active.is_some_and(|active| active != tour.is_active) {
            return false;
        }
        if self.agency_id.is_some_and(|agency| agency != tour.agency_id) {
            return false;
        }

        let start_ok = |bound: Option<DateTime<Utc>>, cmp: fn(&DateTime<Utc>, &DateTime<Utc>) -> bool| {
            bound.map_or(true, |b| tour.start_date.is_some_and(|s| cmp(&s, &b)))
        };
        let end_ok = |bound: Option<DateTime<Utc>>, cmp: fn(&DateTime<Utc>, &DateTime<Utc>) -> bool| {
            bound.map_or(true, |b| tour.end_date.is_some_and(|e| cmp(&e, &b)))
        };

        start_ok(self.starts_at_or_before, |s, b| s <= b)
            && start_ok(self.starts_after, |s, b| s > b)
            && end_ok(self.ends_at_or_after, |e, b| e >= b)
            && end_ok(self.ends_before, |e, b| e < b)
    }
}

/// Partial tour update
#[derive(Debug, Clone)]
pub struct TourPatch {
    pub touched_at: DateTime<Utc>,
    pub tour_status: Option<TourStatus>,
    pub is_active: Option<bool>,
    pub price: Option<i64>,
    pub max_participants: Option<i32>,
    pub schedule: Option<TourSchedule>,
}

impl TourPatch {
    pub fn at(touched_at: DateTime<Utc>) -> Self {
        Self {
            touched_at,
            tour_status: None,
            is_active: None,
            price: None,
            max_participants: None,
            schedule: None,
        }
    }

    pub fn tour_status(mut self, status: TourStatus) -> Self {
        self.tour_status = Some(status);
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn max_participants(mut self, max_participants: i32) -> Self {
        self.max_participants = Some(max_participants);
        self
    }

    pub fn schedule(mut self, schedule: TourSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn apply(&self, tour: &mut Tour) {
        if let Some(status) = self.tour_status {
            tour.tour_status = status;
        }
        if let Some(is_active) = self.is_active {
            tour.is_active = is_active;
        }
        if let Some(price) = self.price {
            tour.price = price;
        }
        if let Some(max) = self.max_participants {
            tour.max_participants = max;
        }
        if let Some(schedule) = self.schedule {
            tour.start_date = Some(schedule.start_date);
            tour.end_date = Some(schedule.end_date);
        }
        tour.updated_at = self.touched_at;
    }
}

/// Booking predicate
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub tour_ids: Option<Vec<Uuid>>,
    pub user_id: Option<Uuid>,
    pub guest_email: Option<String>,
    pub statuses: Option<Vec<BookingStatus>>,
    pub payment_statuses: Option<Vec<PaymentStatus>>,
    pub nft_minted: Option<bool>,
    pub booking_date_before: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl BookingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tour(self, tour_id: Uuid) -> Self {
        self.tours(vec![tour_id])
    }

    pub fn tours(mut self, tour_ids: impl Into<Vec<Uuid>>) -> Self {
        self.tour_ids = Some(tour_ids.into());
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn guest_email(mut self, email: impl Into<String>) -> Self {
        self.guest_email = Some(email.into());
        self
    }

    pub fn status(self, status: BookingStatus) -> Self {
        self.statuses(vec![status])
    }

    pub fn statuses(mut self, statuses: impl Into<Vec<BookingStatus>>) -> Self {
        self.statuses = Some(statuses.into());
        self
    }

    pub fn payment_status(self, status: PaymentStatus) -> Self {
        self.payment_statuses(vec![status])
    }

    pub fn payment_statuses(mut self, statuses: impl Into<Vec<PaymentStatus>>) -> Self {
        self.payment_statuses = Some(statuses.into());
        self
    }

    pub fn nft_minted(mut self, minted: bool) -> Self {
        self.nft_minted = Some(minted);
        self
    }

    pub fn booking_date_before(mut self, at: DateTime<Utc>) -> Self {
        self.booking_date_before = Some(at);
        self
    }

    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    /// Guard matching exactly the current state of `booking`
    pub fn current_state_of(booking: &Booking) -> Self {
        Self::new()
            .status(booking.status)
            .payment_status(booking.payment_status)
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(tour_ids) = &self.tour_ids {
            if !tour_ids.contains(&booking.tour_id) {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if booking.owner.user_id() != Some(user_id) {
                return false;
            }
        }
        if let Some(email) = &self.guest_email {
            match &booking.owner {
                crate::booking::BookingOwner::Guest { email: owner, .. }
                    if owner.eq_ignore_ascii_case(email) => {}
                _ => return false,
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&booking.status) {
                return false;
            }
        }
        if let Some(statuses) = &self.payment_statuses {
            if !statuses.contains(&booking.payment_status) {
                return false;
            }
        }
        if self.nft_minted.is_some_and(|minted| minted != booking.nft_minted) {
            return false;
        }
        if self
            .booking_date_before
            .is_some_and(|at| booking.booking_date >= at)
        {
            return false;
        }
        if self.created_before.is_some_and(|at| booking.created_at >= at) {
            return false;
        }
        true
    }
}

/// Partial booking update
#[derive(Debug, Clone)]
pub struct BookingPatch {
    pub touched_at: DateTime<Utc>,
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub hedera_transaction_id: Option<String>,
    pub fiat_payment: Option<FiatPayment>,
    pub nft_minted: Option<bool>,
    pub nft_serial_number: Option<Option<String>>,
}

impl BookingPatch {
    pub fn at(touched_at: DateTime<Utc>) -> Self {
        Self {
            touched_at,
            status: None,
            payment_status: None,
            payment_method: None,
            hedera_transaction_id: None,
            fiat_payment: None,
            nft_minted: None,
            nft_serial_number: None,
        }
    }

    pub fn status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn hedera_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.hedera_transaction_id = Some(transaction_id.into());
        self
    }

    pub fn fiat_payment(mut self, payment: FiatPayment) -> Self {
        self.fiat_payment = Some(payment);
        self
    }

    /// Set the minted flag; the serial is cleared when unminting
    pub fn nft_minted(mut self, minted: bool, serial_number: Option<String>) -> Self {
        self.nft_minted = Some(minted);
        self.nft_serial_number = Some(serial_number);
        self
    }

    pub fn apply(&self, booking: &mut Booking) {
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(status) = self.payment_status {
            booking.payment_status = status;
        }
        if let Some(method) = self.payment_method {
            booking.payment_method = method;
        }
        if let Some(tx) = &self.hedera_transaction_id {
            booking.hedera_transaction_id = Some(tx.clone());
        }
        if let Some(payment) = &self.fiat_payment {
            booking.fiat_payment = Some(payment.clone());
        }
        if let Some(minted) = self.nft_minted {
            booking.nft_minted = minted;
        }
        if let Some(serial) = &self.nft_serial_number {
            booking.nft_serial_number = serial.clone();
        }
        booking.updated_at = self.touched_at;
    }
}

/// Review predicate
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub tour_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
}

impl ReviewFilter {
    pub fn matches(&self, review: &Review) -> bool {
        self.tour_id.map_or(true, |id| id == review.tour_id)
            && self.user_id.map_or(true, |id| id == review.user_id)
            && self.booking_id.map_or(true, |id| id == review.booking_id)
    }
}

/// Partial review update
#[derive(Debug, Clone)]
pub struct ReviewPatch {
    pub touched_at: DateTime<Utc>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
    pub images: Option<Vec<String>>,
}

impl ReviewPatch {
    pub fn apply(&self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(comment) = &self.comment {
            review.comment = comment.clone();
        }
        if let Some(images) = &self.images {
            review.images = images.clone();
        }
        review.updated_at = self.touched_at;
    }
}
