//! Services layer - Business logic
//!
//! This module contains the business logic of the access gate:
//! - Session resolution and sign-in/sign-out (`auth`)
//! - Ban policy (`ban`)
//! - Daily-activity recording (`activity`)
//! - Identity provider adapter (`identity`)

pub mod activity;
pub mod auth;
pub mod ban;
pub mod identity;

pub use activity::ActivityService;
pub use auth::{AuthOutcome, AuthService, AuthServiceError};
pub use ban::BanService;
pub use identity::{ExternalIdentity, HttpIdentityProvider, IdentityError, IdentityProvider};
