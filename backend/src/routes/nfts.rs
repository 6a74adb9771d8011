//! NFT route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn nft_routes() -> Router<AppState> {
    Router::new()
        .route("/api/nfts", axum::routing::post(record_mint))
        .route("/api/nfts/my", get(my_nfts))
        .route("/api/nfts/:id", get(get_nft))
}
