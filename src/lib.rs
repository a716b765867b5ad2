//! SafeZone chat core
//!
//! Buddy-to-buddy conversations with simulated replies, plus a notification
//! feed for messages, check-in flags and community alerts.

pub mod api;
pub mod app;
pub mod bridge;
pub mod chat;
pub mod config;
pub mod delivery;
pub mod notifications;
pub mod seed;

pub use app::App;
pub use config::{Config, ConfigError};
