//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod ban;
pub mod daily_active;
pub mod session;
pub mod user;

pub use ban::{BanRepository, SqlxBanRepository};
pub use daily_active::{DailyActiveRepository, SqlxDailyActiveRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
