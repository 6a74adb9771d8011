//! NFT mint records linked to tours and bookings

mod model;
mod service;

pub use model::*;
pub use service::NftService;
