//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session entity for cookie-based authentication.
///
/// A session is valid only while its token resolves to this row and the
/// linked user still exists. Expired or orphaned tokens are treated the
/// same as no session at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token (primary key)
    pub token: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
