//! Authentication middleware
//!
//! Middleware for JWT token verification and user extraction.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{verify_token, JwtAuth, JwtError};
use crate::models::{Caller, UserRole};

/// Authenticated user extracted from JWT token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn caller(&self) -> Caller {
        Caller::user(self.user_id, self.role)
    }
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthError {
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn new(code: &str, message: &str) -> Self {
        Self {
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Extractor for authenticated users
///
/// This extractor verifies the JWT token from the Authorization header
/// and extracts the authenticated user information.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_bookings(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Bookings of {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<JwtAuth>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the Authorization header
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError::new(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .into_response()
                })?;

        let auth = Arc::<JwtAuth>::from_ref(state);

        let claims = verify_token(bearer.token(), auth.jwt_secret()).map_err(|e| {
            let (code, message) = match e {
                JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
                _ => ("INVALID_TOKEN", "Invalid token"),
            };
            AuthError::new(code, message).into_response()
        })?;

        let user_id = claims.user_id().map_err(|_| {
            AuthError::new("INVALID_TOKEN", "Invalid user ID in token").into_response()
        })?;
        let role = claims.role().map_err(|_| {
            AuthError::new("INVALID_TOKEN", "Invalid role in token").into_response()
        })?;

        Ok(AuthenticatedUser { user_id, role })
    }
}

/// Optional authenticated user extractor
///
/// Yields `None` only when no Authorization header is sent. A header that is
/// present but malformed, forged or expired is rejected like `AuthenticatedUser`.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<JwtAuth>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalUser(None));
        }
        AuthenticatedUser::from_request_parts(parts, state)
            .await
            .map(|user| OptionalUser(Some(user)))
    }
}
