//! Admin API endpoints
//!
//! Handles HTTP requests for admin management:
//! - User listing and role changes
//! - Ban management (create, lift, list)
//! - Daily-active counts
//!
//! All routes require an authenticated admin; the router is mounted
//! behind the `require_auth` and `require_admin` middleware.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::auth::UserResponse;
use crate::api::middleware::{ApiError, AppState};
use crate::models::UserRole;

/// Query parameters for user listing
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

/// Response for a user listing page
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Request for changing a user's role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Request for creating a ban
#[derive(Debug, Deserialize)]
pub struct CreateBanRequest {
    pub email: String,
    /// When the ban lapses; omit for a permanent ban
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Response for a ban
#[derive(Debug, Serialize)]
pub struct BanResponse {
    pub email: String,
    pub expires_at: Option<String>,
    pub reason: Option<String>,
    pub active: bool,
    pub created_at: String,
}

impl From<crate::models::Ban> for BanResponse {
    fn from(ban: crate::models::Ban) -> Self {
        let active = ban.is_active(Utc::now());
        Self {
            email: ban.email,
            expires_at: ban.expires_at.map(|e| e.to_rfc3339()),
            reason: ban.reason,
            active,
            created_at: ban.created_at.to_rfc3339(),
        }
    }
}

/// Query parameters for the daily-active count
#[derive(Debug, Deserialize)]
pub struct DailyActiveQuery {
    /// Date to count, in the platform's reference timezone (UTC+7)
    pub date: NaiveDate,
}

/// Response for the daily-active count
#[derive(Debug, Serialize)]
pub struct DailyActiveResponse {
    pub date: NaiveDate,
    pub count: i64,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        // User management
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(update_role))
        // Ban management
        .route("/bans", get(list_bans))
        .route("/bans", post(create_ban))
        .route("/bans/{email}", delete(remove_ban))
        // Activity stats
        .route("/daily-actives", get(get_daily_actives))
}

/// GET /api/admin/users - List users with pagination
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let page = query.page.max(1);
    let per_page = query.per_page.clamp(1, 100);

    let (users, total) = state
        .user_repo
        .list(page, per_page)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
        total,
        page,
        per_page,
    }))
}

/// PUT /api/admin/users/{id}/role - Change a user's role
async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let role = UserRole::from_str(&body.role)
        .map_err(|_| ApiError::validation_error(format!("Unknown role '{}'", body.role)))?;

    let mut user = state
        .user_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user.role = role;
    let updated = state
        .user_repo
        .update(&user)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    tracing::info!(user_id = id, role = %updated.role, "User role changed");

    Ok(Json(updated.into()))
}

/// GET /api/admin/bans - List all bans
async fn list_bans(
    State(state): State<AppState>,
) -> Result<Json<Vec<BanResponse>>, ApiError> {
    let bans = state
        .ban_service
        .list()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(bans.into_iter().map(Into::into).collect()))
}

/// POST /api/admin/bans - Create or replace a ban
///
/// Upserts on email, so re-banning an address overwrites the previous
/// expiry and reason.
async fn create_ban(
    State(state): State<AppState>,
    Json(body): Json<CreateBanRequest>,
) -> Result<(StatusCode, Json<BanResponse>), ApiError> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation_error("Invalid email address"));
    }

    let ban = state
        .ban_service
        .ban(&email, body.expires_at, body.reason)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    tracing::info!(email = %ban.email, "Ban created");

    Ok((StatusCode::CREATED, Json(ban.into())))
}

/// DELETE /api/admin/bans/{email} - Lift a ban
async fn remove_ban(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .ban_service
        .unban(&email)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    tracing::info!(email = %email, "Ban lifted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/daily-actives?date=YYYY-MM-DD - Distinct active users on a date
async fn get_daily_actives(
    State(state): State<AppState>,
    Query(query): Query<DailyActiveQuery>,
) -> Result<Json<DailyActiveResponse>, ApiError> {
    let count = state
        .activity_service
        .count_on(query.date)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(DailyActiveResponse {
        date: query.date,
        count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ban_response_marks_permanent_ban_active() {
        let ban = crate::models::Ban {
            email: "walker@example.com".to_string(),
            expires_at: None,
            reason: Some("spam".to_string()),
            created_at: Utc::now(),
        };
        let response: BanResponse = ban.into();
        assert!(response.active);
        assert!(response.expires_at.is_none());
    }

    #[test]
    fn test_ban_response_marks_lapsed_ban_inactive() {
        let ban = crate::models::Ban {
            email: "walker@example.com".to_string(),
            expires_at: Some(Utc::now() - Duration::hours(1)),
            reason: None,
            created_at: Utc::now() - Duration::days(2),
        };
        let response: BanResponse = ban.into();
        assert!(!response.active);
    }

    #[test]
    fn test_list_users_query_defaults() {
        let query: ListUsersQuery =
            serde_json::from_str("{}").expect("Defaults should deserialize");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 20);
    }
}
