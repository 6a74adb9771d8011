//! In-process notification bus for booking lifecycle events
//!
//! Publishing never blocks and never fails the caller: a send with no live
//! subscriber is only logged.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::tour::TourStatus;

/// Events emitted by lifecycle transitions
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    BookingCreated { booking_id: Uuid, tour_id: Uuid },
    PaymentSucceeded { booking_id: Uuid, amount: i64, transaction_id: Option<String> },
    BookingConfirmed { booking_id: Uuid },
    BookingCancelled { booking_id: Uuid },
    PaymentRefunded { booking_id: Uuid },
    BookingsCompleted { booking_ids: Vec<Uuid> },
    BookingsExpired { booking_ids: Vec<Uuid> },
    TourPhaseChanged { tour_id: Uuid, status: TourStatus },
    ReviewPosted { review_id: Uuid, tour_id: Uuid, rating: i32 },
    NftMinted { nft_id: Uuid, booking_id: Option<Uuid> },
}

/// Broadcast channel shared by services and subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: BookingEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No subscriber for booking event: {:?}", e.0);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Log every event until all senders are dropped
pub async fn log_events(mut rx: broadcast::Receiver<BookingEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!(event = ?event, "Booking event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
