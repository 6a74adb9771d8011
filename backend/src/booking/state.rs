//! Booking state machine
//!
//! `pending -> confirmed -> completed`, and `pending | confirmed ->
//! cancelled`. Payment runs on its own axis: `pending -> paid | failed`,
//! `failed -> paid`, `paid -> refunded`. Everything here is pure; the
//! service layer turns the resulting patches into guarded writes.

use chrono::{DateTime, Utc};

use super::{Booking, BookingStatus, FiatPayment, PaymentMethod, PaymentStatus};
use crate::error::{CoreError, CoreResult};
use crate::store::BookingPatch;

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Paid, Refunded)
        )
    }
}

/// Reject a status change the state machine does not allow
pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// Reject a payment status change the state machine does not allow
pub fn ensure_payment_transition(from: PaymentStatus, to: PaymentStatus) -> CoreResult<()> {
    if from == PaymentStatus::Paid && to == PaymentStatus::Paid {
        return Err(CoreError::AlreadyPaid);
    }
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// A booking may only be completed once its date, or its tour, is over
pub fn ensure_completable(
    booking: &Booking,
    tour_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    ensure_transition(booking.status, BookingStatus::Completed)?;

    let booking_past = booking.booking_date < now;
    let tour_over = tour_end.is_some_and(|end| end < now);
    if booking_past || tour_over {
        Ok(())
    } else {
        Err(CoreError::InvalidState(
            "booking cannot be completed before it has taken place".to_string(),
        ))
    }
}

/// Proof of a successful payment
#[derive(Debug, Clone)]
pub enum Settlement {
    Card(FiatPayment),
    Ledger {
        method: PaymentMethod,
        transaction_id: String,
    },
}

/// Patch that marks a booking paid
///
/// A pending booking is always advanced to confirmed in the same write.
pub fn payment_patch(
    booking: &Booking,
    settlement: Settlement,
    now: DateTime<Utc>,
) -> CoreResult<BookingPatch> {
    if booking.status.is_terminal() {
        return Err(CoreError::InvalidTransition {
            from: booking.status.as_str(),
            to: BookingStatus::Confirmed.as_str(),
        });
    }
    ensure_payment_transition(booking.payment_status, PaymentStatus::Paid)?;

    let mut patch = BookingPatch::at(now).payment_status(PaymentStatus::Paid);
    if booking.status == BookingStatus::Pending {
        patch = patch.status(BookingStatus::Confirmed);
    }

    patch = match settlement {
        Settlement::Card(payment) => patch.payment_method(PaymentMethod::Fiat).fiat_payment(payment),
        Settlement::Ledger {
            method,
            transaction_id,
        } => patch
            .payment_method(method)
            .hedera_transaction_id(transaction_id),
    };

    Ok(patch)
}

/// Patch that records a failed external payment attempt
pub fn payment_failed_patch(booking: &Booking, now: DateTime<Utc>) -> CoreResult<BookingPatch> {
    if booking.status.is_terminal() {
        return Err(CoreError::InvalidTransition {
            from: booking.status.as_str(),
            to: PaymentStatus::Failed.as_str(),
        });
    }
    if booking.payment_status == PaymentStatus::Failed {
        return Ok(BookingPatch::at(now));
    }
    ensure_payment_transition(booking.payment_status, PaymentStatus::Failed)?;
    Ok(BookingPatch::at(now).payment_status(PaymentStatus::Failed))
}

/// Patch that refunds a paid booking and closes it if still open
pub fn refund_patch(booking: &Booking, now: DateTime<Utc>) -> CoreResult<BookingPatch> {
    if booking.payment_status != PaymentStatus::Paid {
        return Err(CoreError::InvalidState(
            "booking is not paid, cannot refund".to_string(),
        ));
    }

    let mut patch = BookingPatch::at(now).payment_status(PaymentStatus::Refunded);
    if booking.status.can_transition_to(BookingStatus::Cancelled) {
        patch = patch.status(BookingStatus::Cancelled);
    }
    Ok(patch)
}
