//! Review service layer - review gate and tour rating upkeep

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{CreateReviewRequest, Review, UpdateReviewRequest};
use crate::booking::BookingStatus;
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::events::{BookingEvent, EventBus};
use crate::models::Caller;
use crate::store::{ReviewFilter, ReviewPatch, Store, StoreError};
use crate::tour::Tour;

fn ensure_rating(rating: i32) -> CoreResult<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "rating must be between 1 and 5".to_string(),
        ))
    }
}

/// Review service
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Post a verified review for a completed booking
    pub async fn create_review(
        &self,
        caller: &Caller,
        tour_id: Uuid,
        request: CreateReviewRequest,
    ) -> CoreResult<Review> {
        let user_id = caller.user_id().ok_or_else(|| {
            CoreError::Forbidden("only registered users can review tours".to_string())
        })?;
        ensure_rating(request.rating)?;
        request.validate()?;

        self.load_tour(tour_id).await?;
        let booking = self
            .store
            .get_booking(request.booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", request.booking_id)))?;

        if !booking.owner.is_owned_by(caller) {
            return Err(CoreError::Forbidden(
                "not allowed to review this booking".to_string(),
            ));
        }
        if booking.tour_id != tour_id {
            return Err(CoreError::InvalidState(
                "booking does not belong to this tour".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(CoreError::InvalidState(
                "You can only review completed tours".to_string(),
            ));
        }

        let existing = self
            .store
            .find_reviews(&ReviewFilter {
                tour_id: Some(tour_id),
                user_id: Some(user_id),
                booking_id: Some(booking.id),
            })
            .await?;
        if !existing.is_empty() {
            return Err(CoreError::Duplicate(
                "You have already reviewed this booking".to_string(),
            ));
        }

        let now = self.clock.now();
        let review = Review {
            id: Uuid::new_v4(),
            tour_id,
            user_id,
            booking_id: booking.id,
            rating: request.rating,
            comment: request.comment,
            images: request.images,
            is_verified: true,
            created_at: now,
            updated_at: now,
        };

        let review = self.store.insert_review(&review).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                CoreError::Duplicate("You have already reviewed this booking".to_string())
            }
            other => other.into(),
        })?;
        self.refresh_rating(tour_id).await?;

        tracing::info!(review_id = %review.id, tour_id = %tour_id, rating = review.rating, "Review posted");
        self.events.publish(BookingEvent::ReviewPosted {
            review_id: review.id,
            tour_id,
            rating: review.rating,
        });
        Ok(review)
    }

    /// Edit a review as its author
    pub async fn update_review(
        &self,
        caller: &Caller,
        review_id: Uuid,
        request: UpdateReviewRequest,
    ) -> CoreResult<Review> {
        request.validate()?;
        if let Some(rating) = request.rating {
            ensure_rating(rating)?;
        }

        let review = self.load_review(review_id).await?;
        if caller.user_id() != Some(review.user_id) {
            return Err(CoreError::Forbidden(
                "not allowed to edit this review".to_string(),
            ));
        }

        let patch = ReviewPatch {
            touched_at: self.clock.now(),
            rating: request.rating,
            comment: request.comment,
            images: request.images,
        };
        let updated = self
            .store
            .update_review(review_id, &patch)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Review {}", review_id)))?;
        self.refresh_rating(updated.tour_id).await?;

        tracing::info!(review_id = %review_id, "Review updated");
        Ok(updated)
    }

    /// Delete a review as its author or an admin; returns the re-rated tour
    pub async fn delete_review(&self, caller: &Caller, review_id: Uuid) -> CoreResult<Tour> {
        let review = self.load_review(review_id).await?;
        if caller.user_id() != Some(review.user_id) && !caller.is_admin() {
            return Err(CoreError::Forbidden(
                "not allowed to delete this review".to_string(),
            ));
        }

        if !self.store.delete_review(review_id).await? {
            return Err(CoreError::NotFound(format!("Review {}", review_id)));
        }
        let tour = self.refresh_rating(review.tour_id).await?;

        tracing::info!(review_id = %review_id, tour_id = %review.tour_id, "Review deleted");
        Ok(tour)
    }

    pub async fn tour_reviews(&self, tour_id: Uuid) -> CoreResult<Vec<Review>> {
        self.load_tour(tour_id).await?;
        Ok(self
            .store
            .find_reviews(&ReviewFilter {
                tour_id: Some(tour_id),
                ..Default::default()
            })
            .await?)
    }

    pub async fn my_reviews(&self, caller: &Caller) -> CoreResult<Vec<Review>> {
        let user_id = caller.user_id().ok_or_else(|| {
            CoreError::Forbidden("guests have no reviews".to_string())
        })?;
        Ok(self
            .store
            .find_reviews(&ReviewFilter {
                user_id: Some(user_id),
                ..Default::default()
            })
            .await?)
    }

    async fn refresh_rating(&self, tour_id: Uuid) -> CoreResult<Tour> {
        self.store
            .refresh_tour_rating(tour_id, self.clock.now())
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tour {}", tour_id)))
    }

    async fn load_tour(&self, tour_id: Uuid) -> CoreResult<Tour> {
        self.store
            .get_tour(tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tour {}", tour_id)))
    }

    async fn load_review(&self, review_id: Uuid) -> CoreResult<Review> {
        self.store
            .get_review(review_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Review {}", review_id)))
    }
}
