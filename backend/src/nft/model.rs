//! NFT mint records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// What an NFT certifies
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "nft_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NftKind {
    ProofOfVisit,
    Artisanat,
    TourPackage,
}

/// Record of a token minted on the ledger
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Nft {
    pub id: Uuid,
    pub token_id: String,
    pub kind: NftKind,
    pub owner_id: Uuid,
    pub serial_number: String,
    pub metadata: serde_json::Value,
    pub related_tour_id: Option<Uuid>,
    pub related_booking_id: Option<Uuid>,
    pub hedera_transaction_id: Option<String>,
    pub minted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for recording a mint
#[derive(Debug, Deserialize, Validate)]
pub struct MintNftRequest {
    #[validate(length(min = 1, max = 128))]
    pub token_id: String,
    pub kind: NftKind,
    #[validate(length(min = 1, max = 64))]
    pub serial_number: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub related_tour_id: Option<Uuid>,
    pub related_booking_id: Option<Uuid>,
    pub hedera_transaction_id: Option<String>,
}
