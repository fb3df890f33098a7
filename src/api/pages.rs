//! Page endpoints
//!
//! Minimal server-rendered pages: the public redirect targets of the
//! route guard (`/sign-in`, `/unauthorized`, `/banned`) and the guarded
//! profile and admin pages. The real UI lives in the web frontend; these
//! pages exist so the guard's redirects land somewhere sensible when the
//! backend is hit directly.

use axum::{
    extract::Query,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::middleware::{AppState, AuthenticatedUser};

/// Query parameters for the banned page
#[derive(Debug, Deserialize)]
pub struct BannedQuery {
    pub reason: Option<String>,
}

/// Build the public page router (guard redirect targets)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(sign_in_page))
        .route("/unauthorized", get(unauthorized_page))
        .route("/banned", get(banned_page))
}

/// Build the guarded page router (mounted behind the route guard)
pub fn guarded_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile_page))
        .route("/admin", get(admin_page))
        .route("/admin/{*rest}", get(admin_page))
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{title}</h1><p>{body}</p></body></html>"
    ))
}

/// Minimal HTML escaping for user-supplied text
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn sign_in_page() -> Html<String> {
    page("Sign in", "Sign in with your account to continue.")
}

async fn unauthorized_page() -> Html<String> {
    page("Unauthorized", "You do not have access to this page.")
}

async fn banned_page(Query(query): Query<BannedQuery>) -> Html<String> {
    let body = match query.reason.as_deref() {
        Some(reason) => format!("Your account is banned: {}", escape_html(reason)),
        None => "Your account is banned.".to_string(),
    };
    page("Banned", &body)
}

async fn profile_page(user: AuthenticatedUser) -> Html<String> {
    let name = user
        .0
        .display_name
        .as_deref()
        .unwrap_or(&user.0.username);
    page("Profile", &format!("Signed in as {}.", escape_html(name)))
}

async fn admin_page(user: AuthenticatedUser) -> Html<String> {
    page(
        "Admin",
        &format!("Admin dashboard for {}.", escape_html(&user.0.username)),
    )
}
