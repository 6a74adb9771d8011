//! Shared models for the Beyond The Map backend

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Agency,
    Artist,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Agency => "agency",
            UserRole::Artist => "artist",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "agency" => Some(UserRole::Agency),
            "artist" => Some(UserRole::Artist),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Resolved identity of whoever is calling into the core
///
/// Credential checks happen before this value exists; the core only looks
/// at who the caller is, never at how they proved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    User { user_id: Uuid, role: UserRole },
    Guest { email: String, name: Option<String> },
}

impl Caller {
    pub fn user(user_id: Uuid, role: UserRole) -> Self {
        Caller::User { user_id, role }
    }

    pub fn guest(email: impl Into<String>, name: Option<String>) -> Self {
        Caller::Guest {
            email: email.into().trim().to_lowercase(),
            name,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Caller::User {
                role: UserRole::Admin,
                ..
            }
        )
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Caller::User { user_id, .. } => Some(*user_id),
            Caller::Guest { .. } => None,
        }
    }

    pub fn role(&self) -> Option<UserRole> {
        match self {
            Caller::User { role, .. } => Some(*role),
            Caller::Guest { .. } => None,
        }
    }
}
