//! Data Transfer Objects for the HTTP API.
//!
//! Response shapes follow the session API the dashboard speaks, so
//! [`RemoteRepository`](crate::db::RemoteRepository) can talk to this server.

use serde::{Deserialize, Serialize};

pub use crate::db::models::{Session, SessionSummary};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// "connected", "disconnected" or "error: ..."
    pub session_store: String,
}

/// `GET /api/db-status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStatusResponse {
    pub available: bool,
}

/// `GET /api/sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// `POST /api/sessions` and `PUT /api/sessions/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSavedResponse {
    pub success: bool,
    pub session: SessionSummary,
}

/// `GET /api/sessions/latest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestSessionResponse {
    pub session: Option<Session>,
}

/// `DELETE /api/sessions/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDeletedResponse {
    pub success: bool,
    pub message: String,
}
