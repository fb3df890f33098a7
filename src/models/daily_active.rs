//! Daily-activity model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Marker that a user was seen active on a calendar date.
///
/// The date component is computed in the platform's fixed reference
/// timezone (UTC+7) and the (user_id, date) pair is unique; the row is
/// never updated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyActive {
    /// User that was seen active
    pub user_id: i64,
    /// Calendar date (UTC+7)
    pub date: NaiveDate,
}
