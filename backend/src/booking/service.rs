//! Booking service layer - booking lifecycle management

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::state::{
    ensure_completable, ensure_transition, payment_failed_patch, payment_patch, refund_patch,
    Settlement,
};
use super::{
    Booking, BookingOwner, BookingStatus, CreateBookingRequest, ListBookingsQuery,
    PaymentMethod, PaymentOutcome, PaymentStatus, RecordPaymentRequest,
};
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::events::{BookingEvent, EventBus};
use crate::models::Caller;
use crate::store::{BookingFilter, BookingPatch, Store};
use crate::tour::{can_manage, resolve_status, Tour, TourStatus};

/// Guarded writes retried before giving up with `Conflict`
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Booking service for managing the booking lifecycle
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Create a pending booking on an active tour
    pub async fn create_booking(
        &self,
        caller: &Caller,
        request: CreateBookingRequest,
    ) -> CoreResult<Booking> {
        request.validate()?;

        let tour = self.load_tour(request.tour_id).await?;
        let now = self.clock.now();
        if !tour.is_active || resolve_status(&tour, now) == TourStatus::Cancelled {
            return Err(CoreError::Inactive(format!(
                "tour {} is not available for booking",
                tour.id
            )));
        }

        if request.number_of_participants > tour.max_participants {
            return Err(CoreError::Validation(format!(
                "at most {} participants allowed",
                tour.max_participants
            )));
        }

        let owner = BookingOwner::of(caller);
        if matches!(owner, BookingOwner::Guest { .. })
            && request.payment_method != PaymentMethod::Fiat
        {
            return Err(CoreError::Forbidden(
                "guest bookings must be paid by card".to_string(),
            ));
        }

        let total_price = tour
            .price
            .checked_mul(i64::from(request.number_of_participants))
            .ok_or_else(|| CoreError::Validation("total price out of range".to_string()))?;

        let booking = Booking {
            id: Uuid::new_v4(),
            tour_id: tour.id,
            owner,
            booking_date: request.booking_date,
            number_of_participants: request.number_of_participants,
            total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            hedera_transaction_id: None,
            fiat_payment: None,
            nft_minted: false,
            nft_serial_number: None,
            special_requests: request.special_requests,
            created_at: now,
            updated_at: now,
        };

        let booking = self.store.insert_booking(&booking).await?;
        tracing::info!(booking_id = %booking.id, tour_id = %tour.id, total_price, "Booking created");
        self.events.publish(BookingEvent::BookingCreated {
            booking_id: booking.id,
            tour_id: tour.id,
        });
        Ok(booking)
    }

    /// Get a booking visible to the caller
    pub async fn get_booking(&self, caller: &Caller, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.find(booking_id).await?;
        if booking.owner.is_owned_by(caller) || caller.is_admin() {
            return Ok(booking);
        }

        let tour = self.load_tour(booking.tour_id).await?;
        if can_manage(caller, &tour) {
            Ok(booking)
        } else {
            Err(CoreError::Forbidden(
                "not allowed to view this booking".to_string(),
            ))
        }
    }

    /// Bookings owned by the caller, newest first
    pub async fn my_bookings(&self, caller: &Caller) -> CoreResult<Vec<Booking>> {
        let filter = match caller {
            Caller::User { user_id, .. } => BookingFilter::new().user(*user_id),
            Caller::Guest { email, .. } => BookingFilter::new().guest_email(email.clone()),
        };
        Ok(self.store.find_bookings(&filter).await?)
    }

    /// Bookings of a tour, for its agency or an admin
    pub async fn tour_bookings(
        &self,
        caller: &Caller,
        tour_id: Uuid,
        query: ListBookingsQuery,
    ) -> CoreResult<Vec<Booking>> {
        let tour = self.load_tour(tour_id).await?;
        if !can_manage(caller, &tour) {
            return Err(CoreError::Forbidden(
                "not allowed to list bookings of this tour".to_string(),
            ));
        }

        let mut filter = BookingFilter::new().tour(tour_id);
        if let Some(status) = query.status {
            filter = filter.status(status);
        }
        Ok(self.store.find_bookings(&filter).await?)
    }

    /// Status change by the owning agency or an admin
    pub async fn update_booking_status(
        &self,
        caller: &Caller,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> CoreResult<Booking> {
        let booking = self.find(booking_id).await?;
        let tour = self.load_tour(booking.tour_id).await?;
        if !can_manage(caller, &tour) {
            return Err(CoreError::Forbidden(
                "only the tour agency or an admin can change booking status".to_string(),
            ));
        }

        let now = self.clock.now();
        let tour_end = tour.end_date;
        let (before, after) = self
            .transition(booking, move |b| {
                if new_status == BookingStatus::Completed {
                    ensure_completable(b, tour_end, now)?;
                } else {
                    ensure_transition(b.status, new_status)?;
                }
                Ok(BookingPatch::at(now).status(new_status))
            })
            .await?;

        tracing::info!(
            booking_id = %booking_id,
            from = before.status.as_str(),
            to = after.status.as_str(),
            "Booking status updated"
        );
        self.publish_status_change(&after);
        Ok(after)
    }

    /// Cancel a booking as its owner or an admin; payment status is left alone
    pub async fn cancel_booking(&self, caller: &Caller, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.find(booking_id).await?;
        if !(booking.owner.is_owned_by(caller) || caller.is_admin()) {
            return Err(CoreError::Forbidden(
                "not allowed to cancel this booking".to_string(),
            ));
        }

        let now = self.clock.now();
        let (_, cancelled) = self
            .transition(booking, move |b| {
                ensure_transition(b.status, BookingStatus::Cancelled)?;
                Ok(BookingPatch::at(now).status(BookingStatus::Cancelled))
            })
            .await?;

        tracing::info!(booking_id = %booking_id, "Booking cancelled");
        self.events.publish(BookingEvent::BookingCancelled { booking_id });
        Ok(cancelled)
    }

    /// Mark a booking paid and confirm it in one guarded write
    pub async fn apply_payment(
        &self,
        booking: Booking,
        settlement: Settlement,
    ) -> CoreResult<Booking> {
        let now = self.clock.now();
        let (before, paid) = self
            .transition(booking, move |b| payment_patch(b, settlement.clone(), now))
            .await?;

        let transaction_id = paid
            .fiat_payment
            .as_ref()
            .map(|p| p.transaction_id.clone())
            .or_else(|| paid.hedera_transaction_id.clone());
        tracing::info!(booking_id = %paid.id, amount = paid.total_price, "Payment applied");

        self.events.publish(BookingEvent::PaymentSucceeded {
            booking_id: paid.id,
            amount: paid.total_price,
            transaction_id,
        });
        if before.status != paid.status {
            self.events
                .publish(BookingEvent::BookingConfirmed { booking_id: paid.id });
        }
        Ok(paid)
    }

    /// Record the outcome of a ledger or wallet payment made outside the platform
    pub async fn record_external_payment(
        &self,
        caller: &Caller,
        booking_id: Uuid,
        request: RecordPaymentRequest,
    ) -> CoreResult<Booking> {
        let booking = self.find(booking_id).await?;
        if !(booking.owner.is_owned_by(caller) || caller.is_admin()) {
            return Err(CoreError::Forbidden(
                "not allowed to pay for this booking".to_string(),
            ));
        }

        if !matches!(request.method, PaymentMethod::Hedera | PaymentMethod::Wallet) {
            return Err(CoreError::Validation(
                "only hedera or wallet payments can be recorded".to_string(),
            ));
        }

        match request.outcome {
            PaymentOutcome::Paid => {
                let transaction_id = request.transaction_id.ok_or_else(|| {
                    CoreError::Validation("transaction_id is required".to_string())
                })?;
                let settlement = Settlement::Ledger {
                    method: request.method,
                    transaction_id,
                };
                self.apply_payment(booking, settlement).await
            }
            PaymentOutcome::Failed => {
                let now = self.clock.now();
                let (_, failed) = self
                    .transition(booking, move |b| payment_failed_patch(b, now))
                    .await?;
                tracing::warn!(booking_id = %booking_id, "External payment failed");
                Ok(failed)
            }
        }
    }

    /// Refund a paid booking; an open booking is cancelled with it
    pub async fn refund_booking(&self, caller: &Caller, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.find(booking_id).await?;
        let tour = self.load_tour(booking.tour_id).await?;
        if !can_manage(caller, &tour) {
            return Err(CoreError::Forbidden(
                "only the tour agency or an admin can refund".to_string(),
            ));
        }

        let now = self.clock.now();
        let (before, refunded) = self
            .transition(booking, move |b| refund_patch(b, now))
            .await?;

        tracing::info!(booking_id = %booking_id, amount = refunded.total_price, "Booking refunded");
        self.events.publish(BookingEvent::PaymentRefunded { booking_id });
        if before.status != refunded.status {
            self.events.publish(BookingEvent::BookingCancelled { booking_id });
        }
        Ok(refunded)
    }

    /// Complete confirmed bookings whose date has passed
    pub async fn complete_past_bookings(&self, now: DateTime<Utc>) -> CoreResult<Vec<Uuid>> {
        let filter = BookingFilter::new()
            .status(BookingStatus::Confirmed)
            .booking_date_before(now);
        let patch = BookingPatch::at(now).status(BookingStatus::Completed);
        let ids: Vec<Uuid> = self
            .store
            .update_bookings(&filter, &patch)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        if !ids.is_empty() {
            self.events.publish(BookingEvent::BookingsCompleted {
                booking_ids: ids.clone(),
            });
        }
        Ok(ids)
    }

    /// Cancel unpaid pending bookings older than `max_age`
    pub async fn expire_stale_bookings(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> CoreResult<Vec<Uuid>> {
        let filter = BookingFilter::new()
            .status(BookingStatus::Pending)
            .payment_status(PaymentStatus::Pending)
            .created_before(now - max_age);
        let patch = BookingPatch::at(now).status(BookingStatus::Cancelled);
        let ids: Vec<Uuid> = self
            .store
            .update_bookings(&filter, &patch)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        for booking_id in &ids {
            tracing::warn!(booking_id = %booking_id, "Stale booking expired");
        }
        if !ids.is_empty() {
            self.events.publish(BookingEvent::BookingsExpired {
                booking_ids: ids.clone(),
            });
        }
        Ok(ids)
    }

    /// Load a booking or fail with `NotFound`
    pub async fn find(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))
    }

    async fn load_tour(&self, tour_id: Uuid) -> CoreResult<Tour> {
        self.store
            .get_tour(tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Tour {}", tour_id)))
    }

    /// Compare-and-set loop over the booking's current status pair
    ///
    /// `plan` is re-run against the fresh row after a lost race, so its
    /// checks always see the state the write is guarded on.
    async fn transition<F>(&self, mut booking: Booking, plan: F) -> CoreResult<(Booking, Booking)>
    where
        F: Fn(&Booking) -> CoreResult<BookingPatch> + Send + Sync,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let patch = plan(&booking)?;
            let guard = BookingFilter::current_state_of(&booking);
            if let Some(updated) = self.store.update_booking(booking.id, &guard, &patch).await? {
                return Ok((booking, updated));
            }

            tracing::debug!(booking_id = %booking.id, attempt, "Booking changed concurrently, retrying");
            booking = self.find(booking.id).await?;
        }

        Err(CoreError::Conflict(format!(
            "booking {} kept changing",
            booking.id
        )))
    }

    fn publish_status_change(&self, booking: &Booking) {
        let booking_id = booking.id;
        match booking.status {
            BookingStatus::Confirmed => self
                .events
                .publish(BookingEvent::BookingConfirmed { booking_id }),
            BookingStatus::Cancelled => self
                .events
                .publish(BookingEvent::BookingCancelled { booking_id }),
            BookingStatus::Completed => self.events.publish(BookingEvent::BookingsCompleted {
                booking_ids: vec![booking_id],
            }),
            BookingStatus::Pending => {}
        }
    }
}
