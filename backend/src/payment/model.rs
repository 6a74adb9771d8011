//! Payment request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::booking::{BookingStatus, PaymentMethod, PaymentStatus};
use crate::error::{CoreError, CoreResult};

fn default_gateway() -> String {
    "card".to_string()
}

/// Card details submitted to confirm a booking payment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    pub booking_id: Uuid,
    pub card_number: Option<String>,
    pub cardholder_name: Option<String>,
    pub expiry_date: Option<String>,
    pub cvv: Option<String>,
    #[serde(default = "default_gateway")]
    #[validate(length(min = 1, max = 32))]
    pub payment_gateway: String,
    /// Contact email of a guest booking, used when no bearer token is sent
    #[validate(email)]
    pub email: Option<String>,
}

/// Card details once every field is known to be present
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub cardholder_name: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl CardDetails {
    /// All four card fields are required and must be non-blank; the number
    /// may only hold digits once spaces and dashes are stripped
    pub fn from_request(request: &ConfirmPaymentRequest) -> CoreResult<Self> {
        let present = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| CoreError::Validation("All card details are required".to_string()))
        };

        let number = present(&request.card_number)?.replace(|c: char| c == ' ' || c == '-', "");
        if !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Validation(
                "Card number must contain only digits".to_string(),
            ));
        }

        Ok(Self {
            number,
            cardholder_name: present(&request.cardholder_name)?,
            expiry_date: present(&request.expiry_date)?,
            cvv: present(&request.cvv)?,
        })
    }

    pub fn last4(&self) -> String {
        let len = self.number.chars().count();
        self.number.chars().skip(len.saturating_sub(4)).collect()
    }
}

/// Request DTO for starting a card payment
#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    pub booking_id: Uuid,
    #[serde(default = "default_gateway")]
    #[validate(length(min = 1, max = 32))]
    pub payment_gateway: String,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

/// Simulated payment intent handed back to the client
#[derive(Debug, Serialize, Clone)]
pub struct PaymentIntent {
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub payment_gateway: String,
    pub status: PaymentStatus,
    pub client_secret: String,
}

/// One line of a caller's payment history
#[derive(Debug, Serialize, Clone)]
pub struct PaymentRecord {
    pub booking_id: Uuid,
    pub tour_id: Uuid,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub booking_status: BookingStatus,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Payment method offered to clients
#[derive(Debug, Serialize, Clone)]
pub struct PaymentMethodInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: PaymentMethod,
    pub enabled: bool,
}
