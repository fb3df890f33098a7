//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session cookie resolution)
//! - Authorization (single decision point for pages and the admin tree)
//!
//! There is one decision function, `authorize`, applied to every guarded
//! path. Ban status is evaluated before role, so a banned admin is turned
//! away like any other banned user. When the session store cannot be
//! reached the request is treated as unauthenticated (fail closed) and the
//! failure is logged distinctly from an ordinary miss.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GuardConfig;
use crate::models::User;
use crate::services::activity::ActivityService;
use crate::services::auth::{AuthOutcome, AuthService};
use crate::services::ban::BanService;

/// Session cookie name in plain-HTTP development mode
pub const SESSION_COOKIE: &str = "next-auth.session-token";

/// Session cookie name behind HTTPS (carries the `__Secure-` prefix,
/// which browsers only accept on secure connections)
pub const SECURE_SESSION_COOKIE: &str = "__Secure-next-auth.session-token";

/// The session cookie name in effect for the given transport mode
pub fn session_cookie_name(secure: bool) -> &'static str {
    if secure {
        SECURE_SESSION_COOKIE
    } else {
        SESSION_COOKIE
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub auth_service: Arc<AuthService>,
    pub user_repo: Arc<dyn crate::db::repositories::UserRepository>,
    pub ban_service: Arc<BanService>,
    pub activity_service: Arc<ActivityService>,
    pub identity_provider: Arc<dyn crate::services::identity::IdentityProvider>,
    pub guard: Arc<GuardConfig>,
    pub secure_cookies: bool,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// Extractor for AuthenticatedUser from request extensions
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn banned(reason: Option<&str>) -> Self {
        Self::with_details(
            "USER_BANNED",
            "Account is banned",
            serde_json::json!({ "reason": reason }),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "USER_BANNED" => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Extract the session token from the request cookies.
///
/// Cookie-only: the session is set and read exclusively through the
/// session cookie, no Authorization header fallback.
pub fn extract_session_token(headers: &HeaderMap, secure: bool) -> Option<String> {
    let cookie_name = session_cookie_name(secure);
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// The access decision for a guarded path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Request may proceed
    Allow,
    /// No valid session; send to sign-in
    RedirectSignIn,
    /// Valid session but insufficient role; send to the unauthorized page
    RedirectUnauthorized,
    /// Account is banned; send to the banned page with the reason
    RedirectBanned { reason: Option<String> },
}

/// Whether `path` falls inside the admin tree rooted at `prefix`.
///
/// Matches the prefix itself and everything below it, but not sibling
/// paths that merely share the prefix string ("/administrivia").
fn in_admin_tree(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// Single decision point for all guarded paths.
///
/// Ban status is evaluated before role: a banned admin gets the banned
/// redirect, not admin access.
pub fn authorize(outcome: &AuthOutcome, path: &str, guard: &GuardConfig) -> AccessDecision {
    let (user, ban) = match outcome {
        AuthOutcome::Unauthenticated => return AccessDecision::RedirectSignIn,
        AuthOutcome::Authenticated { user, ban } => (user, ban),
    };

    if let Some(ban) = ban {
        return AccessDecision::RedirectBanned {
            reason: ban.reason.clone(),
        };
    }

    if in_admin_tree(path, &guard.admin_prefix) && !user.is_admin() {
        return AccessDecision::RedirectUnauthorized;
    }

    AccessDecision::Allow
}

/// Resolve the request's session, failing closed on store errors.
///
/// A store failure is logged as an error (distinct from the ordinary
/// unauthenticated case, which is not logged at all) and yields
/// `Unauthenticated` so the caller denies access rather than granting it.
async fn resolve_request(state: &AppState, headers: &HeaderMap) -> AuthOutcome {
    let token = extract_session_token(headers, state.secure_cookies);

    match state.auth_service.resolve(token.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Session store unavailable, denying access");
            AuthOutcome::Unauthenticated
        }
    }
}

/// Route guard middleware for the guarded page tree.
///
/// Applies `authorize` to the request path and answers redirects for
/// everything but `Allow`. Allowed requests carry the authenticated user
/// in their extensions.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let outcome = resolve_request(&state, request.headers()).await;

    match authorize(&outcome, &path, &state.guard) {
        AccessDecision::Allow => {
            if let AuthOutcome::Authenticated { user, .. } = outcome {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            next.run(request).await
        }
        AccessDecision::RedirectSignIn => {
            Redirect::temporary(&state.guard.sign_in_path).into_response()
        }
        AccessDecision::RedirectUnauthorized => {
            Redirect::temporary(&state.guard.unauthorized_path).into_response()
        }
        AccessDecision::RedirectBanned { reason } => {
            let target = match reason {
                Some(reason) => format!(
                    "{}?reason={}",
                    state.guard.banned_path,
                    urlencoding::encode(&reason)
                ),
                None => state.guard.banned_path.clone(),
            };
            Redirect::temporary(&target).into_response()
        }
    }
}

/// Authentication middleware for JSON API routes
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let outcome = resolve_request(&state, request.headers()).await;

    match outcome {
        AuthOutcome::Unauthenticated => {
            Err(ApiError::unauthorized("Invalid or expired session"))
        }
        AuthOutcome::Authenticated { ban: Some(ban), .. } => {
            Err(ApiError::banned(ban.reason.as_deref()))
        }
        AuthOutcome::Authenticated { user, ban: None } => {
            request.extensions_mut().insert(AuthenticatedUser(user));
            Ok(next.run(request).await)
        }
    }
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ban, UserRole};
    use chrono::Utc;

    fn test_user(role: UserRole) -> User {
        User {
            id: 1,
            username: "walker-abc12345".to_string(),
            email: "walker@example.com".to_string(),
            display_name: None,
            avatar: None,
            description: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn authenticated(role: UserRole, ban: Option<Ban>) -> AuthOutcome {
        AuthOutcome::Authenticated {
            user: test_user(role),
            ban,
        }
    }

    fn active_ban(reason: Option<&str>) -> Ban {
        Ban {
            email: "walker@example.com".to_string(),
            expires_at: None,
            reason: reason.map(String::from),
            created_at: Utc::now(),
        }
    }

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_session_cookie_name_by_mode() {
        assert_eq!(session_cookie_name(false), "next-auth.session-token");
        assert_eq!(
            session_cookie_name(true),
            "__Secure-next-auth.session-token"
        );
    }

    #[test]
    fn test_extract_session_token_dev_cookie() {
        let headers = headers_with_cookie("next-auth.session-token=tok-123");
        assert_eq!(
            extract_session_token(&headers, false),
            Some("tok-123".to_string())
        );
    }

    #[test]
    fn test_extract_session_token_secure_cookie() {
        let headers = headers_with_cookie("__Secure-next-auth.session-token=tok-456");
        assert_eq!(
            extract_session_token(&headers, true),
            Some("tok-456".to_string())
        );
    }

    #[test]
    fn test_extract_session_token_wrong_mode() {
        // A dev cookie is not accepted when running in secure mode
        let headers = headers_with_cookie("next-auth.session-token=tok-123");
        assert!(extract_session_token(&headers, true).is_none());
    }

    #[test]
    fn test_extract_session_token_among_other_cookies() {
        let headers =
            headers_with_cookie("theme=dark; next-auth.session-token=tok-789; lang=en");
        assert_eq!(
            extract_session_token(&headers, false),
            Some("tok-789".to_string())
        );
    }

    #[test]
    fn test_extract_session_token_empty_value() {
        let headers = headers_with_cookie("next-auth.session-token=");
        assert!(extract_session_token(&headers, false).is_none());
    }

    #[test]
    fn test_extract_session_token_no_cookie_header() {
        assert!(extract_session_token(&HeaderMap::new(), false).is_none());
    }

    #[test]
    fn test_authorize_unauthenticated_redirects_to_sign_in() {
        let guard = GuardConfig::default();
        assert_eq!(
            authorize(&AuthOutcome::Unauthenticated, "/profile", &guard),
            AccessDecision::RedirectSignIn
        );
        assert_eq!(
            authorize(&AuthOutcome::Unauthenticated, "/admin", &guard),
            AccessDecision::RedirectSignIn
        );
    }

    #[test]
    fn test_authorize_regular_user_allowed_outside_admin_tree() {
        let guard = GuardConfig::default();
        let outcome = authenticated(UserRole::User, None);
        assert_eq!(
            authorize(&outcome, "/profile", &guard),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_authorize_regular_user_denied_admin_tree() {
        let guard = GuardConfig::default();
        let outcome = authenticated(UserRole::User, None);
        assert_eq!(
            authorize(&outcome, "/admin", &guard),
            AccessDecision::RedirectUnauthorized
        );
        assert_eq!(
            authorize(&outcome, "/admin/dashboard", &guard),
            AccessDecision::RedirectUnauthorized
        );
    }

    #[test]
    fn test_authorize_admin_allowed_admin_tree() {
        let guard = GuardConfig::default();
        let outcome = authenticated(UserRole::Admin, None);
        assert_eq!(authorize(&outcome, "/admin", &guard), AccessDecision::Allow);
        assert_eq!(
            authorize(&outcome, "/admin/dashboard", &guard),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_authorize_admin_prefix_is_a_path_boundary() {
        let guard = GuardConfig::default();
        let outcome = authenticated(UserRole::User, None);
        // Shares the prefix string but is not inside the tree
        assert_eq!(
            authorize(&outcome, "/administrivia", &guard),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_authorize_ban_checked_before_role() {
        let guard = GuardConfig::default();
        // A banned admin gets the banned redirect, not admin access
        let outcome = authenticated(UserRole::Admin, Some(active_ban(Some("spam"))));
        assert_eq!(
            authorize(&outcome, "/admin", &guard),
            AccessDecision::RedirectBanned {
                reason: Some("spam".to_string())
            }
        );
    }

    #[test]
    fn test_authorize_banned_user_on_ordinary_path() {
        let guard = GuardConfig::default();
        let outcome = authenticated(UserRole::User, Some(active_ban(None)));
        assert_eq!(
            authorize(&outcome, "/profile", &guard),
            AccessDecision::RedirectBanned { reason: None }
        );
    }

    #[test]
    fn test_api_error_banned_carries_reason() {
        let error = ApiError::banned(Some("spam"));
        assert_eq!(error.error.code, "USER_BANNED");
        assert_eq!(
            error.error.details,
            Some(serde_json::json!({ "reason": "spam" }))
        );
    }

    #[test]
    fn test_api_error_unauthorized() {
        let error = ApiError::unauthorized("Test message");
        assert_eq!(error.error.code, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_authenticated_user_extractor() {
        use axum::extract::FromRequestParts;

        let request = axum::http::Request::builder()
            .uri("/test")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        // Without the extension the extractor rejects with UNAUTHORIZED
        let rejected = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert_eq!(rejected.unwrap_err().error.code, "UNAUTHORIZED");

        parts
            .extensions
            .insert(AuthenticatedUser(test_user(UserRole::User)));
        let extracted = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .expect("Extraction should succeed");
        assert_eq!(extracted.0.email, "walker@example.com");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::{Ban, UserRole};
    use chrono::Utc;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = UserRole> {
        prop_oneof![Just(UserRole::User), Just(UserRole::Admin)]
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        "/[a-z]{1,12}(/[a-z]{1,12}){0,2}"
    }

    fn user_with_role(role: UserRole) -> crate::models::User {
        crate::models::User {
            id: 1,
            username: "walker-abc12345".to_string(),
            email: "walker@example.com".to_string(),
            display_name: None,
            avatar: None,
            description: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn unauthenticated_always_redirects_to_sign_in(path in path_strategy()) {
            let guard = GuardConfig::default();
            let decision = authorize(&crate::services::auth::AuthOutcome::Unauthenticated, &path, &guard);
            prop_assert_eq!(decision, AccessDecision::RedirectSignIn);
        }

        #[test]
        fn ban_dominates_every_role_and_path(role in role_strategy(), path in path_strategy()) {
            let guard = GuardConfig::default();
            let outcome = crate::services::auth::AuthOutcome::Authenticated {
                user: user_with_role(role),
                ban: Some(Ban {
                    email: "walker@example.com".to_string(),
                    expires_at: None,
                    reason: None,
                    created_at: Utc::now(),
                }),
            };
            let decision = authorize(&outcome, &path, &guard);
            prop_assert_eq!(decision, AccessDecision::RedirectBanned { reason: None });
        }

        #[test]
        fn admin_without_ban_is_never_turned_away(path in path_strategy()) {
            let guard = GuardConfig::default();
            let outcome = crate::services::auth::AuthOutcome::Authenticated {
                user: user_with_role(UserRole::Admin),
                ban: None,
            };
            let decision = authorize(&outcome, &path, &guard);
            prop_assert_eq!(decision, AccessDecision::Allow);
        }

        #[test]
        fn regular_user_denied_exactly_in_admin_tree(suffix in "[a-z]{1,12}") {
            let guard = GuardConfig::default();
            let outcome = crate::services::auth::AuthOutcome::Authenticated {
                user: user_with_role(UserRole::User),
                ban: None,
            };
            let inside = format!("/admin/{}", suffix);
            let sibling = format!("/admin{}", suffix);
            prop_assert_eq!(
                authorize(&outcome, &inside, &guard),
                AccessDecision::RedirectUnauthorized
            );
            prop_assert_eq!(authorize(&outcome, &sibling, &guard), AccessDecision::Allow);
        }
    }
}
