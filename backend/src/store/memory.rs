//! In-memory store
//!
//! Same predicate semantics as [`super::PgStore`]; each guarded update runs
//! under a single write lock, so check and write are atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    BookingFilter, BookingPatch, ReviewFilter, ReviewPatch, Store, StoreError, StoreResult,
    TourFilter, TourPatch,
};
use crate::booking::Booking;
use crate::nft::Nft;
use crate::review::{RatingSummary, Review};
use crate::tour::Tour;

#[derive(Default)]
struct Tables {
    tours: HashMap<Uuid, Tour>,
    bookings: HashMap<Uuid, Booking>,
    reviews: HashMap<Uuid, Review>,
    nfts: HashMap<Uuid, Nft>,
}

/// Store backed by process memory; clones share the same tables
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_tour(&self, tour: &Tour) -> StoreResult<Tour> {
        let mut tables = self.tables.write();
        if tables.tours.contains_key(&tour.id) {
            return Err(StoreError::UniqueViolation(format!("tour {}", tour.id)));
        }
        tables.tours.insert(tour.id, tour.clone());
        Ok(tour.clone())
    }

    async fn get_tour(&self, id: Uuid) -> StoreResult<Option<Tour>> {
        Ok(self.tables.read().tours.get(&id).cloned())
    }

    async fn find_tours(&self, filter: &TourFilter) -> StoreResult<Vec<Tour>> {
        let tours = self
            .tables
            .read()
            .tours
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        Ok(newest_first(tours, |t| t.created_at))
    }

    async fn update_tour(
        &self,
        id: Uuid,
        guard: &TourFilter,
        patch: &TourPatch,
    ) -> StoreResult<Option<Tour>> {
        let mut tables = self.tables.write();
        match tables.tours.get_mut(&id) {
            Some(tour) if guard.matches(tour) => {
                patch.apply(tour);
                Ok(Some(tour.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_tours(
        &self,
        filter: &TourFilter,
        patch: &TourPatch,
    ) -> StoreResult<Vec<Tour>> {
        let mut tables = self.tables.write();
        let updated = tables
            .tours
            .values_mut()
            .filter(|t| filter.matches(t))
            .map(|t| {
                patch.apply(t);
                t.clone()
            })
            .collect();
        Ok(updated)
    }

    async fn refresh_tour_rating(
        &self,
        tour_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Tour>> {
        let mut tables = self.tables.write();
        let ratings: Vec<i32> = tables
            .reviews
            .values()
            .filter(|r| r.tour_id == tour_id)
            .map(|r| r.rating)
            .collect();
        let summary = RatingSummary::from_ratings(&ratings);

        Ok(tables.tours.get_mut(&tour_id).map(|tour| {
            tour.rating = summary.rating;
            tour.review_count = summary.review_count;
            tour.updated_at = at;
            tour.clone()
        }))
    }

    async fn insert_booking(&self, booking: &Booking) -> StoreResult<Booking> {
        let mut tables = self.tables.write();
        if tables.bookings.contains_key(&booking.id) {
            return Err(StoreError::UniqueViolation(format!("booking {}", booking.id)));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.read().bookings.get(&id).cloned())
    }

    async fn find_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let bookings = self
            .tables
            .read()
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        Ok(newest_first(bookings, |b| b.created_at))
    }

    async fn update_booking(
        &self,
        id: Uuid,
        guard: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Option<Booking>> {
        let mut tables = self.tables.write();
        match tables.bookings.get_mut(&id) {
            Some(booking) if guard.matches(booking) => {
                patch.apply(booking);
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_bookings(
        &self,
        filter: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Vec<Booking>> {
        let mut tables = self.tables.write();
        let updated = tables
            .bookings
            .values_mut()
            .filter(|b| filter.matches(b))
            .map(|b| {
                patch.apply(b);
                b.clone()
            })
            .collect();
        Ok(updated)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<Review> {
        let mut tables = self.tables.write();
        let duplicate = tables.reviews.values().any(|r| {
            r.tour_id == review.tour_id
                && r.user_id == review.user_id
                && r.booking_id == review.booking_id
        });
        if duplicate || tables.reviews.contains_key(&review.id) {
            return Err(StoreError::UniqueViolation(format!(
                "review for booking {}",
                review.booking_id
            )));
        }
        tables.reviews.insert(review.id, review.clone());
        Ok(review.clone())
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self.tables.read().reviews.get(&id).cloned())
    }

    async fn find_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        let reviews = self
            .tables
            .read()
            .reviews
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(newest_first(reviews, |r| r.created_at))
    }

    async fn update_review(&self, id: Uuid, patch: &ReviewPatch) -> StoreResult<Option<Review>> {
        let mut tables = self.tables.write();
        Ok(tables.reviews.get_mut(&id).map(|review| {
            patch.apply(review);
            review.clone()
        }))
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().reviews.remove(&id).is_some())
    }

    async fn insert_nft(&self, nft: &Nft) -> StoreResult<Nft> {
        let mut tables = self.tables.write();
        if tables.nfts.values().any(|n| n.token_id == nft.token_id) {
            return Err(StoreError::UniqueViolation(format!("token {}", nft.token_id)));
        }
        tables.nfts.insert(nft.id, nft.clone());
        Ok(nft.clone())
    }

    async fn get_nft(&self, id: Uuid) -> StoreResult<Option<Nft>> {
        Ok(self.tables.read().nfts.get(&id).cloned())
    }

    async fn find_nfts(&self, owner_id: Uuid) -> StoreResult<Vec<Nft>> {
        let nfts = self
            .tables
            .read()
            .nfts
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(nfts, |n| n.minted_at))
    }
}
