//! Data models
//!
//! This module contains the data structures used throughout the Gwalk
//! backend. Models represent:
//! - Database entities (User, Session, Ban, DailyActive)
//! - Internal data transfer objects

mod ban;
mod daily_active;
mod session;
mod user;

pub use ban::Ban;
pub use daily_active::DailyActive;
pub use session::Session;
pub use user::{UpdateProfileInput, User, UserRole};
