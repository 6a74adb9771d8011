//! Payment service layer - card confirmation and payment queries

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use validator::Validate;

use super::{
    CardDetails, ConfirmPaymentRequest, GatewayError, InitiatePaymentRequest, PaymentGateway,
    PaymentIntent, PaymentMethodInfo, PaymentRecord,
};
use crate::booking::state::ensure_payment_transition;
use crate::booking::{
    Booking, BookingService, BookingStatus, FiatPayment, PaymentMethod, PaymentStatus, Settlement,
};
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::models::Caller;
use crate::store::{BookingFilter, Store};

/// Payment service for card payments and payment history
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    bookings: BookingService,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        bookings: BookingService,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        currency: String,
    ) -> Self {
        Self {
            store,
            bookings,
            gateway,
            clock,
            currency,
        }
    }

    /// Charge a card and confirm the booking in the same write
    ///
    /// A declined or failed charge leaves the booking untouched.
    pub async fn confirm_payment(
        &self,
        caller: &Caller,
        request: ConfirmPaymentRequest,
    ) -> CoreResult<Booking> {
        request.validate()?;

        let booking = self.payable_booking(caller, request.booking_id).await?;
        let card = CardDetails::from_request(&request)?;

        let now = self.clock.now();
        let receipt = self
            .gateway
            .charge(&card, booking.total_price, &self.currency, now)
            .await
            .map_err(|e| {
                tracing::warn!(booking_id = %booking.id, gateway = self.gateway.name(), error = %e, "Card charge rejected");
                match e {
                    GatewayError::Declined(reason) => CoreError::Declined(reason),
                    GatewayError::Unavailable(reason) => CoreError::PaymentFailed(reason),
                }
            })?;

        let payment = FiatPayment {
            transaction_id: receipt.transaction_id,
            payment_gateway: request.payment_gateway,
            card_last4: card.last4(),
            cardholder_name: card.cardholder_name,
            paid_at: receipt.charged_at,
            currency: self.currency.clone(),
            amount: booking.total_price,
        };

        let booking_id = booking.id;
        self.bookings
            .apply_payment(booking, Settlement::Card(payment))
            .await
            .map_err(|e| {
                tracing::error!(booking_id = %booking_id, error = %e, "Card charged but booking not updated");
                e
            })
    }

    /// Start a card payment for an unpaid booking
    pub async fn initiate_payment(
        &self,
        caller: &Caller,
        request: InitiatePaymentRequest,
    ) -> CoreResult<PaymentIntent> {
        request.validate()?;

        let booking = self.payable_booking(caller, request.booking_id).await?;
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();

        Ok(PaymentIntent {
            booking_id: booking.id,
            amount: booking.total_price,
            currency: request.currency.unwrap_or_else(|| self.currency.clone()),
            payment_gateway: request.payment_gateway,
            status: booking.payment_status,
            client_secret: format!("sim_secret_{}", secret),
        })
    }

    /// Paid and refunded bookings of the caller
    pub async fn payment_history(&self, caller: &Caller) -> CoreResult<Vec<PaymentRecord>> {
        let filter = match caller {
            Caller::User { user_id, .. } => BookingFilter::new().user(*user_id),
            Caller::Guest { email, .. } => BookingFilter::new().guest_email(email.clone()),
        }
        .payment_statuses([PaymentStatus::Paid, PaymentStatus::Refunded]);

        let records = self
            .store
            .find_bookings(&filter)
            .await?
            .into_iter()
            .map(|b| PaymentRecord {
                booking_id: b.id,
                tour_id: b.tour_id,
                amount: b.total_price,
                payment_method: b.payment_method,
                payment_status: b.payment_status,
                booking_status: b.status,
                transaction_id: b
                    .fiat_payment
                    .as_ref()
                    .map(|p| p.transaction_id.clone())
                    .or(b.hedera_transaction_id),
                paid_at: b.fiat_payment.map(|p| p.paid_at),
            })
            .collect();
        Ok(records)
    }

    /// Payment methods offered to clients
    pub fn payment_methods(&self) -> Vec<PaymentMethodInfo> {
        vec![
            PaymentMethodInfo {
                id: "hedera",
                name: "Hedera (HBAR)",
                description: "Pay with HBAR cryptocurrency",
                kind: PaymentMethod::Hedera,
                enabled: true,
            },
            PaymentMethodInfo {
                id: "card",
                name: "Credit/Debit Card",
                description: "Pay with Visa, Mastercard, Amex",
                kind: PaymentMethod::Fiat,
                enabled: true,
            },
            PaymentMethodInfo {
                id: "wallet",
                name: "Wallet",
                description: "Pay from a connected wallet",
                kind: PaymentMethod::Wallet,
                enabled: true,
            },
            PaymentMethodInfo {
                id: "cash",
                name: "Cash on Tour",
                description: "Pay in cash when the tour starts",
                kind: PaymentMethod::Cash,
                enabled: true,
            },
        ]
    }

    /// NotFound, then Forbidden, then AlreadyPaid, then a closed booking
    async fn payable_booking(&self, caller: &Caller, booking_id: uuid::Uuid) -> CoreResult<Booking> {
        let booking = self.bookings.find(booking_id).await?;
        if !booking.owner.is_owned_by(caller) {
            return Err(CoreError::Forbidden(
                "not authorized to pay for this booking".to_string(),
            ));
        }
        ensure_payment_transition(booking.payment_status, PaymentStatus::Paid)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(CoreError::InvalidTransition {
                from: BookingStatus::Cancelled.as_str(),
                to: BookingStatus::Confirmed.as_str(),
            });
        }
        Ok(booking)
    }
}
