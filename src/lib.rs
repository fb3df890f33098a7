//! Gwalk - community events platform backend
//!
//! This library implements the access gate that fronts every Gwalk request:
//! session resolution, ban policy, route guarding and daily-activity
//! recording. Event and team content is served by a separate service.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
