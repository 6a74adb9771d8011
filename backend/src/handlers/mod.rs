//! API handlers for the Beyond The Map backend

mod bookings;
mod health;
mod nfts;
mod payments;
mod reviews;
mod tours;

pub use bookings::*;
pub use health::*;
pub use nfts::*;
pub use payments::*;
pub use reviews::*;
pub use tours::*;

pub use crate::middleware::auth::{AuthenticatedUser, OptionalUser};

use serde::Deserialize;

use crate::error::ApiError;
use crate::models::Caller;

/// Guest contact passed as a query string on guest booking endpoints
#[derive(Debug, Default, Deserialize)]
pub struct GuestContact {
    pub email: Option<String>,
}

/// Bearer identity when present, otherwise the guest contact email
pub(crate) fn resolve_caller(
    user: OptionalUser,
    email: Option<String>,
    name: Option<String>,
) -> Result<Caller, ApiError> {
    if let OptionalUser(Some(user)) = user {
        return Ok(user.caller());
    }

    match email.filter(|e| !e.trim().is_empty()) {
        Some(email) => Ok(Caller::guest(email, name)),
        None => Err(ApiError::Unauthorized(
            "Sign in or provide a contact email".to_string(),
        )),
    }
}
