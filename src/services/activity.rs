//! Daily-activity recorder
//!
//! Records that a user was seen active "today", where today is computed in
//! the platform's fixed reference timezone (UTC+7) and truncated to the
//! date component. The write is an idempotent upsert and is always
//! best-effort at the call site: a failure must never abort the request
//! that triggered it.

use crate::db::repositories::DailyActiveRepository;
use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::Arc;

/// Fixed reference timezone offset for calendar-day bucketing, in hours.
pub const REFERENCE_UTC_OFFSET_HOURS: i32 = 7;

/// Daily-activity recording service
pub struct ActivityService {
    daily_repo: Arc<dyn DailyActiveRepository>,
}

impl ActivityService {
    /// Create a new activity service
    pub fn new(daily_repo: Arc<dyn DailyActiveRepository>) -> Self {
        Self { daily_repo }
    }

    /// Mark the user active today (UTC+7 calendar date).
    ///
    /// Returns `true` if this is the first sighting of the user today.
    pub async fn mark_active(&self, user_id: i64) -> Result<bool> {
        self.daily_repo
            .mark(user_id, reference_date(Utc::now()))
            .await
    }

    /// Mark the user active on the calendar date of an explicit instant
    pub async fn mark_active_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool> {
        self.daily_repo.mark(user_id, reference_date(now)).await
    }

    /// Count distinct users seen active on a date
    pub async fn count_on(&self, date: NaiveDate) -> Result<i64> {
        self.daily_repo.count_on(date).await
    }
}

/// Compute the calendar date of an instant in the reference timezone,
/// discarding the time of day.
pub fn reference_date(now: DateTime<Utc>) -> NaiveDate {
    let offset = FixedOffset::east_opt(REFERENCE_UTC_OFFSET_HOURS * 3600)
        .expect("reference offset is a valid UTC offset");
    now.with_timezone(&offset).date_naive()
}
