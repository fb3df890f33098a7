//! Authentication API endpoints
//!
//! Handles HTTP requests for sign-in and the current user:
//! - POST /api/auth/callback - OAuth code exchange and session creation
//! - POST /api/auth/sign-out - Session invalidation
//! - GET /api/user/@me - Get current user
//! - PUT /api/user/@me - Update current user's profile
//!
//! The session travels in the NextAuth-named cookie so the existing web
//! frontend keeps working unchanged.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    extract_session_token, session_cookie_name, ApiError, AppState, AuthenticatedUser,
};
use crate::models::{Session, UpdateProfileInput};
use crate::services::auth::AuthServiceError;
use crate::services::identity::IdentityError;

/// Request body for the OAuth callback
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Authorization code returned by the identity provider
    pub code: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            display_name: user.display_name,
            avatar: user.avatar,
            description: user.description,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/callback", post(callback))
        .route("/sign-out", post(sign_out))
}

/// Build protected user routes (requires auth middleware)
pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/@me", get(get_current_user))
        .route("/@me", put(update_profile))
}

/// Build the Set-Cookie header for a new session.
///
/// The cookie is HttpOnly and SameSite=Lax; in secure mode it also gets
/// the Secure attribute, which the `__Secure-` name prefix requires.
fn session_cookie(session: &Session, secure: bool) -> String {
    let max_age = (session.expires_at - session.created_at).num_seconds();
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session_cookie_name(secure),
        session.token,
        max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the Set-Cookie header that clears the session cookie
fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        session_cookie_name(secure)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /api/auth/callback - OAuth code exchange
///
/// Exchanges the authorization code with the identity provider, finds or
/// creates the local user, and answers with a session cookie.
async fn callback(
    State(state): State<AppState>,
    Json(body): Json<CallbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state
        .identity_provider
        .exchange_code(&body.code)
        .await
        .map_err(|e| match e {
            IdentityError::ExchangeRejected => {
                ApiError::unauthorized("Authorization code rejected by the identity provider")
            }
            IdentityError::MissingEmail => {
                ApiError::validation_error("Identity provider returned no email address")
            }
            IdentityError::RequestFailed(e) => {
                tracing::error!(error = %e, "Identity provider request failed");
                ApiError::internal_error("Identity provider unreachable")
            }
        })?;

    let (session, user) = state
        .auth_service
        .sign_in(identity)
        .await
        .map_err(|e| match e {
            AuthServiceError::AccountBanned => ApiError::banned(None),
            AuthServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Sign-in failed");
                ApiError::internal_error("Sign-in failed")
            }
        })?;

    let cookie = session_cookie(&session, state.secure_cookies);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse { user: user.into() }),
    ))
}

/// POST /api/auth/sign-out - Invalidate the session
///
/// Always clears the cookie, even when no valid session was attached.
async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers, state.secure_cookies) {
        state.auth_service.sign_out(&token).await.map_err(|e| {
            tracing::error!(error = %e, "Sign-out failed");
            ApiError::internal_error("Sign-out failed")
        })?;
    }

    let clear_cookie = clear_session_cookie(state.secure_cookies);
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&clear_cookie)
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
    );

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/user/@me - Get current user
///
/// Requires authentication.
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// PUT /api/user/@me - Update current user's profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut current_user = user.0;

    if let Some(username) = body.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::validation_error("Username cannot be empty"));
        }
        if username != current_user.username {
            // Usernames are unique; reject a taken name up front
            let taken = state
                .user_repo
                .get_by_username(&username)
                .await
                .map_err(|e| ApiError::internal_error(e.to_string()))?
                .is_some();
            if taken {
                return Err(ApiError::with_details(
                    "CONFLICT",
                    "Username is already taken",
                    serde_json::json!({ "field": "username" }),
                ));
            }
            current_user.username = username;
        }
    }
    if let Some(display_name) = body.display_name {
        current_user.display_name = if display_name.trim().is_empty() {
            None
        } else {
            Some(display_name.trim().to_string())
        };
    }
    if let Some(avatar) = body.avatar {
        current_user.avatar = if avatar.trim().is_empty() {
            None
        } else {
            Some(avatar.trim().to_string())
        };
    }
    if let Some(description) = body.description {
        current_user.description = if description.trim().is_empty() {
            None
        } else {
            Some(description.trim().to_string())
        };
    }

    let updated = state
        .user_repo
        .update(&current_user)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(updated.into()))
}
