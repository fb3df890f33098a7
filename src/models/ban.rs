//! Ban model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ban record, keyed by user email.
///
/// A ban with no expiry is permanent. A ban whose expiry lies at or before
/// the evaluation instant is inactive; only a strictly future expiry keeps
/// the ban in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    /// Banned user's email (primary key)
    pub email: String,
    /// Expiry timestamp; `None` means permanent
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text reason shown to the banned user
    pub reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Ban {
    /// Check if the ban is in force at the given instant.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }
}
