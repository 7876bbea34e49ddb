//! Session repository trait.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::models::{NewSession, Session, SessionId, SessionSummary, SessionUpdate};

/// Repository trait for saved schedule sessions.
///
/// Inputs reaching a repository have already been normalized by
/// [`crate::db::services`]; implementations still refuse a blank name.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if sessions can be stored and read
    /// - `Ok(false)` if the store reports itself unavailable
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// List all sessions, most recently updated first.
    async fn list_sessions(&self) -> RepositoryResult<Vec<SessionSummary>>;

    /// Store a new session.
    ///
    /// # Returns
    /// * `Ok(SessionSummary)` - Summary including the assigned ID
    /// * `Err(RepositoryError::Invalid)` - If the name is blank
    async fn create_session(&self, session: NewSession) -> RepositoryResult<SessionSummary>;

    /// Retrieve a full session by ID.
    ///
    /// # Returns
    /// * `Ok(Session)` - The session including its stored result
    /// * `Err(RepositoryError::NotFound)` - If the session doesn't exist
    async fn get_session(&self, id: SessionId) -> RepositoryResult<Session>;

    /// The most recently updated session, if any.
    async fn latest_session(&self) -> RepositoryResult<Option<Session>>;

    /// Apply a partial update and bump `updated_at`.
    ///
    /// # Returns
    /// * `Ok(SessionSummary)` - The updated summary
    /// * `Err(RepositoryError::NotFound)` - If the session doesn't exist
    /// * `Err(RepositoryError::Invalid)` - If a supplied name is blank
    async fn update_session(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> RepositoryResult<SessionSummary>;

    /// Delete a session.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the session doesn't exist
    async fn delete_session(&self, id: SessionId) -> RepositoryResult<()>;
}
