//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::SessionRepository;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session store behind every `/api/sessions` endpoint
    pub repository: Arc<dyn SessionRepository>,
}

impl AppState {
    /// Create a new application state with the given repository.
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }
}
