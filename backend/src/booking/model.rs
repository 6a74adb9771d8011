//! Booking models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Caller;

/// Booking lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,   // Created, waiting for payment or agency confirmation
    Confirmed, // Paid or confirmed by the agency
    Completed, // Tour has taken place
    Cancelled, // Terminal
}

/// Payment status, orthogonal to the booking status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

/// How the booking is paid for
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Hedera,
    Fiat,
    Cash,
    Wallet,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Wallet
    }
}

/// Who a booking belongs to
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingOwner {
    Registered {
        user_id: Uuid,
    },
    Guest {
        email: String,
        name: Option<String>,
    },
}

impl BookingOwner {
    /// Owner of a booking made by `caller`
    pub fn of(caller: &Caller) -> Self {
        match caller {
            Caller::User { user_id, .. } => BookingOwner::Registered { user_id: *user_id },
            Caller::Guest { email, name } => BookingOwner::Guest {
                email: email.clone(),
                name: name.clone(),
            },
        }
    }

    /// The single ownership check used by every booking operation
    pub fn is_owned_by(&self, caller: &Caller) -> bool {
        match (self, caller) {
            (BookingOwner::Registered { user_id }, Caller::User { user_id: caller_id, .. }) => {
                user_id == caller_id
            }
            (BookingOwner::Guest { email, .. }, Caller::Guest { email: caller_email, .. }) => {
                email.eq_ignore_ascii_case(caller_email)
            }
            _ => false,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            BookingOwner::Registered { user_id } => Some(*user_id),
            BookingOwner::Guest { .. } => None,
        }
    }
}

/// Card payment record kept on a paid booking
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FiatPayment {
    pub transaction_id: String,
    pub payment_gateway: String,
    pub card_last4: String,
    pub cardholder_name: String,
    pub paid_at: DateTime<Utc>,
    pub currency: String,
    pub amount: i64,
}

/// Booking model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub owner: BookingOwner,
    pub booking_date: DateTime<Utc>,
    pub number_of_participants: i32,
    pub total_price: i64, // Frozen at creation
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub hedera_transaction_id: Option<String>,
    pub fiat_payment: Option<FiatPayment>,
    pub nft_minted: bool,
    pub nft_serial_number: Option<String>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a booking
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub tour_id: Uuid,
    pub booking_date: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub number_of_participants: i32,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub special_requests: Option<String>,
    /// Contact details for guest fiat bookings
    #[validate(email)]
    pub email: Option<String>,
    pub customer_name: Option<String>,
}

/// Request DTO for an agency/admin status change
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Reported result of a payment made outside the platform
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Paid,
    Failed,
}

fn default_ledger_method() -> PaymentMethod {
    PaymentMethod::Hedera
}

/// Request DTO for recording a Hedera or wallet payment
#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub outcome: PaymentOutcome,
    #[serde(default = "default_ledger_method")]
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
}

/// Query for a tour's bookings
#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<BookingStatus>,
}
