//! Review models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Verified review left after a completed booking
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub images: Vec<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for posting a review
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    pub rating: i32,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Request DTO for editing a review
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    #[validate(length(min = 1, max = 2000))]
    pub comment: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Aggregate rating of a tour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub rating: f64,
    pub review_count: i32,
}

impl RatingSummary {
    /// Mean of the given ratings, zero when there are none
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self {
                rating: 0.0,
                review_count: 0,
            };
        }

        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        Self {
            rating: sum as f64 / ratings.len() as f64,
            review_count: ratings.len() as i32,
        }
    }
}
