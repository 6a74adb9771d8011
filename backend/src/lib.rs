//! Beyond The Map Backend Library
//!
//! Booking lifecycle core for the tourism marketplace: tours and their phases,
//! bookings and payments, reviews, NFT mint records, and the reconciliation
//! scheduler that keeps stored statuses in line with time.

pub mod auth;
pub mod booking;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod nft;
pub mod payment;
pub mod review;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod tour;
