//! HTTP API for the SafeZone messaging core
//!
//! Thin command/observation boundary over the conversation store and the
//! notification feed.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::app::App;
use std::sync::Arc;

/// Header carrying the caller-supplied actor id on writes
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
}

impl AppState {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }
}
