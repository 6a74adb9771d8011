//! NFT service layer - mint records and booking eligibility

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{MintNftRequest, Nft};
use crate::booking::{Booking, BookingStatus};
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::events::{BookingEvent, EventBus};
use crate::models::Caller;
use crate::store::{BookingFilter, BookingPatch, Store, StoreError};

/// NFT service
#[derive(Clone)]
pub struct NftService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl NftService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Record a minted token, flagging the linked booking as minted
    pub async fn record_mint(&self, caller: &Caller, request: MintNftRequest) -> CoreResult<Nft> {
        request.validate()?;
        let owner_id = caller.user_id().ok_or_else(|| {
            CoreError::Forbidden("only registered users can own NFTs".to_string())
        })?;

        let now = self.clock.now();
        let mut related_tour_id = request.related_tour_id;
        let mut flagged: Option<Booking> = None;

        if let Some(booking_id) = request.related_booking_id {
            let booking = self
                .store
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
            if !booking.owner.is_owned_by(caller) {
                return Err(CoreError::Forbidden(
                    "booking belongs to someone else".to_string(),
                ));
            }
            if booking.status != BookingStatus::Completed {
                return Err(CoreError::InvalidState(
                    "NFTs can only be minted for completed bookings".to_string(),
                ));
            }
            if booking.nft_minted {
                return Err(CoreError::Duplicate(format!(
                    "booking {} already has an NFT",
                    booking_id
                )));
            }

            let guard = BookingFilter::new()
                .status(BookingStatus::Completed)
                .nft_minted(false);
            let patch = BookingPatch::at(now).nft_minted(true, Some(request.serial_number.clone()));
            let updated = self
                .store
                .update_booking(booking_id, &guard, &patch)
                .await?
                .ok_or_else(|| {
                    CoreError::Duplicate(format!("booking {} already has an NFT", booking_id))
                })?;

            related_tour_id = related_tour_id.or(Some(updated.tour_id));
            flagged = Some(updated);
        }

        let metadata = if request.metadata.is_null() {
            serde_json::json!({})
        } else {
            request.metadata
        };

        let nft = Nft {
            id: Uuid::new_v4(),
            token_id: request.token_id,
            kind: request.kind,
            owner_id,
            serial_number: request.serial_number,
            metadata,
            related_tour_id,
            related_booking_id: request.related_booking_id,
            hedera_transaction_id: request.hedera_transaction_id,
            minted_at: now,
            created_at: now,
        };

        let nft = match self.store.insert_nft(&nft).await {
            Ok(nft) => nft,
            Err(e) => {
                if let Some(booking) = flagged {
                    self.unflag(&booking).await;
                }
                return Err(match e {
                    StoreError::UniqueViolation(_) => {
                        CoreError::Duplicate(format!("token {} already recorded", nft.token_id))
                    }
                    other => other.into(),
                });
            }
        };

        tracing::info!(nft_id = %nft.id, token_id = %nft.token_id, owner_id = %owner_id, "NFT recorded");
        self.events.publish(BookingEvent::NftMinted {
            nft_id: nft.id,
            booking_id: nft.related_booking_id,
        });
        Ok(nft)
    }

    pub async fn my_nfts(&self, caller: &Caller) -> CoreResult<Vec<Nft>> {
        let owner_id = caller.user_id().ok_or_else(|| {
            CoreError::Forbidden("guests have no NFTs".to_string())
        })?;
        Ok(self.store.find_nfts(owner_id).await?)
    }

    pub async fn get_nft(&self, nft_id: Uuid) -> CoreResult<Nft> {
        self.store
            .get_nft(nft_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("NFT {}", nft_id)))
    }

    /// Undo the minted flag after the record could not be written
    async fn unflag(&self, booking: &Booking) {
        let guard = BookingFilter::new().nft_minted(true);
        let patch = BookingPatch::at(self.clock.now()).nft_minted(false, None);
        match self.store.update_booking(booking.id, &guard, &patch).await {
            Ok(_) => tracing::warn!(booking_id = %booking.id, "NFT flag reverted"),
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "Failed to revert NFT flag")
            }
        }
    }
}
