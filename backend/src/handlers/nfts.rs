//! NFT HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::nft::{MintNftRequest, Nft, NftService};

/// POST /api/nfts
pub async fn record_mint(
    State(service): State<Arc<NftService>>,
    user: AuthenticatedUser,
    Json(request): Json<MintNftRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Nft>>), ApiError> {
    let nft = service.record_mint(&user.caller(), request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(nft))))
}

/// GET /api/nfts/my
pub async fn my_nfts(
    State(service): State<Arc<NftService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Nft>>>, ApiError> {
    let nfts = service.my_nfts(&user.caller()).await?;
    Ok(Json(ApiResponse::ok(nfts)))
}

/// GET /api/nfts/:id
pub async fn get_nft(
    State(service): State<Arc<NftService>>,
    Path(nft_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Nft>>, ApiError> {
    let nft = service.get_nft(nft_id).await?;
    Ok(Json(ApiResponse::ok(nft)))
}
