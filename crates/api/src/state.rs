use std::sync::Arc;

use wes_core::registry::JobRegistry;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The registry is
/// constructed once at startup and injected here; nothing in the system
/// reaches for a global.
#[derive(Clone)]
pub struct AppState {
    /// All jobs accepted during this process's lifetime.
    pub registry: Arc<JobRegistry>,
    /// Server configuration (runner command, base URL, CORS).
    pub config: Arc<ServerConfig>,
}
