//! Reconciliation duties

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::booking::BookingService;
use crate::clock::Clock;
use crate::tour::TourService;

/// One independently scheduled piece of reconciliation work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duty {
    /// Move tours between phases and complete bookings of finished tours
    TourPhases,
    /// Complete confirmed bookings whose date has passed
    BookingCompletion,
    /// Cancel unpaid pending bookings past the stale threshold
    StaleBookingExpiry,
}

impl Duty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Duty::TourPhases => "tour_phases",
            Duty::BookingCompletion => "booking_completion",
            Duty::StaleBookingExpiry => "stale_booking_expiry",
        }
    }
}

/// Result of running one duty
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DutyOutcome {
    Done { changed: usize },
    /// The previous run of this duty was still in flight
    Skipped,
    Failed(String),
}

/// Outcome of every duty in one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tour_phases: DutyOutcome,
    pub booking_completion: DutyOutcome,
    pub stale_booking_expiry: DutyOutcome,
}

impl TickReport {
    pub fn changed(&self) -> usize {
        [
            &self.tour_phases,
            &self.booking_completion,
            &self.stale_booking_expiry,
        ]
        .iter()
        .map(|outcome| match outcome {
            DutyOutcome::Done { changed } => *changed,
            _ => 0,
        })
        .sum()
    }
}

/// Runs reconciliation duties, never two runs of the same duty at once
#[derive(Clone)]
pub struct Reconciler {
    tours: TourService,
    bookings: BookingService,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    tour_lock: Arc<Mutex<()>>,
    booking_lock: Arc<Mutex<()>>,
    expiry_lock: Arc<Mutex<()>>,
}

impl Reconciler {
    pub fn new(
        tours: TourService,
        bookings: BookingService,
        clock: Arc<dyn Clock>,
        stale_after: Duration,
    ) -> Self {
        Self {
            tours,
            bookings,
            clock,
            stale_after,
            tour_lock: Arc::new(Mutex::new(())),
            booking_lock: Arc::new(Mutex::new(())),
            expiry_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run all three duties once, in order; a failing duty does not stop the rest
    pub async fn run_reconciliation_tick(&self) -> TickReport {
        TickReport {
            tour_phases: self.run_duty(Duty::TourPhases).await,
            booking_completion: self.run_duty(Duty::BookingCompletion).await,
            stale_booking_expiry: self.run_duty(Duty::StaleBookingExpiry).await,
        }
    }

    /// Run one duty unless its previous run is still going
    pub async fn run_duty(&self, duty: Duty) -> DutyOutcome {
        let lock = match duty {
            Duty::TourPhases => &self.tour_lock,
            Duty::BookingCompletion => &self.booking_lock,
            Duty::StaleBookingExpiry => &self.expiry_lock,
        };
        let Ok(_guard) = lock.try_lock() else {
            tracing::warn!(duty = duty.as_str(), "Previous run still in progress, skipping");
            return DutyOutcome::Skipped;
        };

        let now = self.clock.now();
        tracing::info!(duty = duty.as_str(), "Running reconciliation duty");

        let result = match duty {
            Duty::TourPhases => self.tours.advance_phases(now).await.map(|advance| {
                tracing::info!(
                    started = advance.started.len(),
                    completed = advance.completed.len(),
                    rescheduled = advance.rescheduled.len(),
                    bookings_completed = advance.bookings_completed.len(),
                    "Tour phases reconciled"
                );
                advance.tours_changed() + advance.bookings_completed.len()
            }),
            Duty::BookingCompletion => self.bookings.complete_past_bookings(now).await.map(|ids| {
                tracing::info!(count = ids.len(), "Past bookings completed");
                ids.len()
            }),
            Duty::StaleBookingExpiry => self
                .bookings
                .expire_stale_bookings(now, self.stale_after)
                .await
                .map(|ids| {
                    tracing::info!(count = ids.len(), "Stale bookings expired");
                    ids.len()
                }),
        };

        match result {
            Ok(changed) => DutyOutcome::Done { changed },
            Err(e) => {
                tracing::error!(duty = duty.as_str(), error = %e, "Reconciliation duty failed");
                DutyOutcome::Failed(e.to_string())
            }
        }
    }
}
