//! Ban policy
//!
//! Point-in-time predicate over a user's email determining access
//! suspension. The check is recomputed on every session resolution; there
//! is no caching, so a ban or unban takes effect on the user's very next
//! request.

use crate::db::repositories::BanRepository;
use crate::models::Ban;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Ban policy service
pub struct BanService {
    ban_repo: Arc<dyn BanRepository>,
}

impl BanService {
    /// Create a new ban service
    pub fn new(ban_repo: Arc<dyn BanRepository>) -> Self {
        Self { ban_repo }
    }

    /// Get the ban record in force for an email, if any.
    ///
    /// - No record: not banned
    /// - Record with no expiry: banned (permanent)
    /// - Record with expiry strictly in the future: banned
    /// - Record with expiry at or before now: not banned
    pub async fn active_ban(&self, email: &str) -> Result<Option<Ban>> {
        self.active_ban_at(email, Utc::now()).await
    }

    /// Same as [`active_ban`](Self::active_ban) at an explicit instant
    pub async fn active_ban_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Ban>> {
        let ban = self
            .ban_repo
            .get_by_email(email)
            .await
            .context("Failed to look up ban")?;

        Ok(ban.filter(|b| b.is_active(now)))
    }

    /// Check whether an email is currently banned
    pub async fn is_banned(&self, email: &str) -> Result<bool> {
        Ok(self.active_ban(email).await?.is_some())
    }

    /// Create or replace a ban record (administrative action)
    pub async fn ban(
        &self,
        email: &str,
        expires_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    ) -> Result<Ban> {
        let ban = Ban {
            email: email.to_string(),
            expires_at,
            reason,
            created_at: Utc::now(),
        };

        self.ban_repo
            .upsert(&ban)
            .await
            .context("Failed to create ban")
    }

    /// Remove a ban record (administrative action)
    pub async fn unban(&self, email: &str) -> Result<()> {
        self.ban_repo
            .delete(email)
            .await
            .context("Failed to remove ban")
    }

    /// List all ban records, including expired ones
    pub async fn list(&self) -> Result<Vec<Ban>> {
        self.ban_repo.list().await.context("Failed to list bans")
    }
}
