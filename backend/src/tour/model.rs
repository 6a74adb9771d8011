//! Tour models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};

/// Tour lifecycle phase
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "tour_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TourStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled, // Set by hand, never derived
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Upcoming => "upcoming",
            TourStatus::Ongoing => "ongoing",
            TourStatus::Completed => "completed",
            TourStatus::Cancelled => "cancelled",
        }
    }
}

/// Tour model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Tour {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub name: String,
    pub location: String,
    pub price: i64, // Minor currency units per participant
    pub max_participants: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub tour_status: TourStatus,
    pub is_active: bool,
    pub rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    /// Both ends of the tour window, when the tour is scheduled
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Time left before the tour starts, `None` once it has started
    pub fn time_until_start(&self, now: DateTime<Utc>) -> Option<Countdown> {
        self.start_date.and_then(|start| Countdown::between(now, start))
    }

    /// Time left before the tour ends, `None` once it has ended
    pub fn time_until_end(&self, now: DateTime<Utc>) -> Option<Countdown> {
        self.end_date.and_then(|end| Countdown::between(now, end))
    }
}

/// Remaining time until a tour boundary
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub milliseconds: i64,
    pub days: i64,
    pub hours: i64,
    pub human_readable: String,
}

impl Countdown {
    fn between(now: DateTime<Utc>, target: DateTime<Utc>) -> Option<Self> {
        let diff = target - now;
        if diff < chrono::Duration::zero() {
            return None;
        }

        let days = diff.num_days();
        let hours = diff.num_hours() % 24;
        let human_readable = if days > 0 {
            format!("{} days, {} hours", days, hours)
        } else {
            format!("{} hours", hours)
        };

        Some(Self {
            milliseconds: diff.num_milliseconds(),
            days,
            hours,
            human_readable,
        })
    }
}

/// Tour with its freshly resolved phase and countdowns
#[derive(Debug, Serialize, Clone)]
pub struct TourDetails {
    pub tour: Tour,
    pub current_status: TourStatus,
    pub time_until_start: Option<Countdown>,
    pub time_until_end: Option<Countdown>,
}

/// Start and end of a scheduled tour
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct TourSchedule {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl TourSchedule {
    /// Dates must come as a pair, start first
    pub fn from_parts(
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> CoreResult<Option<Self>> {
        match (start_date, end_date) {
            (None, None) => Ok(None),
            (Some(start_date), Some(end_date)) if start_date <= end_date => Ok(Some(Self {
                start_date,
                end_date,
            })),
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "start_date must not be after end_date".to_string(),
            )),
            _ => Err(CoreError::Validation(
                "start_date and end_date must be provided together".to_string(),
            )),
        }
    }
}

/// Request DTO for creating a tour
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTourRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(range(min = 1))]
    pub max_participants: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Request DTO for editing a tour
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTourRequest {
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(range(min = 1))]
    pub max_participants: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Query parameters for listing tours
#[derive(Debug, Default, Deserialize)]
pub struct ListToursQuery {
    pub status: Option<TourStatus>,
    pub agency_id: Option<Uuid>,
    pub include_inactive: Option<bool>,
}
