//! Bearer token authentication
//!
//! Verifies HS256 access tokens and turns them into a caller identity.

mod jwt;

pub use jwt::{create_token, verify_token, Claims, JwtError};

/// Holds the secret used to verify access tokens
#[derive(Clone)]
pub struct JwtAuth {
    secret: String,
}

impl JwtAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.secret
    }
}
