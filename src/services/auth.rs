//! Authentication service
//!
//! Implements the session side of the access gate:
//! - Sign-in: map an external identity to a local user (creating one on
//!   first sight) and mint a session
//! - Session resolution: token to {Unauthenticated, Authenticated}
//! - Sign-out: destroy the session
//!
//! Session resolution also evaluates the ban policy and, for non-banned
//! users, triggers the daily-activity recorder. The activity write is
//! best-effort: failures are logged and swallowed so they never fail the
//! surrounding request.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Ban, Session, User};
use crate::services::activity::ActivityService;
use crate::services::ban::BanService;
use crate::services::identity::ExternalIdentity;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session lifetime in days
const DEFAULT_SESSION_DAYS: i64 = 7;

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Sign-in is not possible for a banned account
    #[error("Account is banned")]
    AccountBanned,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Outcome of resolving a session token.
///
/// An expired or orphaned token is indistinguishable from no token at all.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// No valid session
    Unauthenticated,
    /// Valid session; `ban` carries the ban in force for the user, if any
    Authenticated { user: User, ban: Option<Ban> },
}

impl AuthOutcome {
    /// The authenticated user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthOutcome::Unauthenticated => None,
            AuthOutcome::Authenticated { user, .. } => Some(user),
        }
    }
}

/// Authentication service
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    bans: Arc<BanService>,
    activity: Arc<ActivityService>,
    session_days: i64,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        bans: Arc<BanService>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            bans,
            activity,
            session_days: DEFAULT_SESSION_DAYS,
        }
    }

    /// Create a new authentication service with a custom session lifetime
    pub fn with_session_days(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        bans: Arc<BanService>,
        activity: Arc<ActivityService>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            bans,
            activity,
            session_days,
        }
    }

    /// Sign in with an identity obtained from the external provider.
    ///
    /// Looks up the local user by email, creating one on first sight with a
    /// generated placeholder username and no avatar. Banned accounts cannot
    /// sign in. Returns the new session and the user.
    pub async fn sign_in(
        &self,
        identity: ExternalIdentity,
    ) -> Result<(Session, User), AuthServiceError> {
        if self.bans.is_banned(&identity.email).await? {
            return Err(AuthServiceError::AccountBanned);
        }

        let user = match self
            .user_repo
            .get_by_email(&identity.email)
            .await
            .context("Failed to look up user by email")?
        {
            Some(user) => user,
            None => {
                let user = User::new(
                    placeholder_username(),
                    identity.email.clone(),
                    identity.name.clone(),
                );
                let created = self
                    .user_repo
                    .create(&user)
                    .await
                    .context("Failed to create user")?;
                tracing::info!(user_id = created.id, "Created user on first sign-in");
                created
            }
        };

        let session = self.create_session(user.id).await?;

        Ok((session, user))
    }

    /// Resolve a session token into an authentication outcome.
    ///
    /// A single fresh point read per call; no caching. A missing token, a
    /// store miss, an expired session or a missing linked user all produce
    /// `Unauthenticated`. On success the ban policy is evaluated and, for
    /// non-banned users, today's activity marker is written best-effort.
    pub async fn resolve(&self, token: Option<&str>) -> Result<AuthOutcome, AuthServiceError> {
        let Some(token) = token else {
            return Ok(AuthOutcome::Unauthenticated);
        };

        let session = match self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(AuthOutcome::Unauthenticated),
        };

        if session.is_expired() {
            // Clean up the stale row; an expired token equals no session
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!(error = %e, "Failed to delete expired session, continuing");
            }
            return Ok(AuthOutcome::Unauthenticated);
        }

        // Orphaned token: session row without a user
        let user = match self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?
        {
            Some(u) => u,
            None => return Ok(AuthOutcome::Unauthenticated),
        };

        let ban = self.bans.active_ban(&user.email).await?;

        if ban.is_none() {
            if let Err(e) = self.activity.mark_active(user.id).await {
                tracing::warn!(
                    user_id = user.id,
                    error = %e,
                    "Failed to record daily activity, continuing"
                );
            }
        }

        Ok(AuthOutcome::Authenticated { user, ban })
    }

    /// Sign out (invalidate the session)
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Delete all expired sessions.
    ///
    /// Maintenance operation, called periodically. Returns the number of
    /// sessions deleted.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, AuthServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, AuthServiceError> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

/// Generate a placeholder username for a first-time sign-in
fn placeholder_username() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("walker-{}", &id[..8])
}
