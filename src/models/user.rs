//! User model
//!
//! This module defines the User entity for the Gwalk platform. Accounts are
//! created on first sign-in through the external identity provider; there is
//! no local password credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered Gwalk user.
///
/// Users carry a role (`User` or `Admin`) which determines access to the
/// admin surface. Ban state is not stored on the user row; it lives in the
/// `bans` table keyed by email (see [`crate::models::Ban`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique, generated on first sign-in)
    pub username: String,
    /// Email address (unique, from the identity provider)
    pub email: String,
    /// Display name shown on event and team pages
    pub display_name: Option<String>,
    /// Avatar image reference
    pub avatar: Option<String>,
    /// Free-text profile description
    pub description: Option<String>,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The id is set by the database on insert.
    pub fn new(username: String, email: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username,
            email,
            display_name,
            avatar: None,
            description: None,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User role for authorization.
///
/// A closed enumeration: ordinary user or administrator. Role is mutated
/// only by administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Ordinary user
    User,
    /// Administrator - access to the admin dashboard
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for updating the current user's profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    /// New username (optional)
    pub username: Option<String>,
    /// New display name (optional)
    pub display_name: Option<String>,
    /// New avatar reference (optional)
    pub avatar: Option<String>,
    /// New profile description (optional)
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "walker-1a2b".to_string(),
            "walker@example.com".to_string(),
            Some("Walker".to_string()),
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "walker-1a2b");
        assert_eq!(user.email, "walker@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(user.avatar.is_none());
    }

    #[test]
    fn test_user_is_admin() {
        let mut user = User::new("u".to_string(), "u@test.com".to_string(), None);
        assert!(!user.is_admin());

        user.role = UserRole::Admin;
        assert!(user.is_admin());
    }

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::User.to_string(), "user");
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("ADMIN").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("user").unwrap(), UserRole::User);
        assert!(UserRole::from_str("moderator").is_err());
    }

    #[test]
    fn test_user_role_default() {
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
