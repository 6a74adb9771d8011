//! Middleware for the Beyond The Map API
//!
//! Request tracing, security headers, and bearer-token extractors.

pub mod auth;
mod security;
mod tracing;

pub use auth::{AuthenticatedUser, OptionalUser};
pub use security::{hsts_header, security_headers};
pub use tracing::request_tracing;
