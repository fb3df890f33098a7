//! API layer - HTTP handlers and routing
//!
//! This module contains the HTTP surface of the Gwalk access gate:
//! - Auth endpoints (OAuth callback, sign-out)
//! - Current-user endpoints
//! - Admin endpoints (users, bans, daily actives)
//! - Redirect target pages and the guarded page tree

pub mod admin;
pub mod auth;
pub mod middleware;
pub mod pages;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{AccessDecision, ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let user_routes = Router::new()
        .nest("/user", auth::user_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(user_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // CORS with credentials so the frontend can send the session cookie
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    // The guarded page tree sits behind the route guard; redirect targets
    // stay public so the guard's redirects cannot loop
    let guarded_pages = pages::guarded_router().route_layer(
        axum_middleware::from_fn_with_state(state.clone(), middleware::route_guard),
    );

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .merge(pages::public_router())
        .merge(guarded_pages)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
