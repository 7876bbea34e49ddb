//! In-memory local repository implementation.
//!
//! Sessions live in a `BTreeMap` behind a `parking_lot::RwLock`, which gives
//! fast, deterministic and isolated behaviour for tests and for running the
//! session server without a database.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::models::{NewSession, Session, SessionId, SessionSummary, SessionUpdate};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult, SessionRepository};
use crate::db::services::{normalize_name, normalize_text};

/// In-memory local repository.
///
/// # Example
/// ```
/// use r2s_workspace::db::repositories::LocalRepository;
/// use r2s_workspace::db::SessionRepository;
///
/// # tokio_test_block_on(async {
/// let repo = LocalRepository::new();
/// assert!(repo.list_sessions().await.unwrap().is_empty());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct StoredSession {
    session: Session,
    /// Write sequence, breaks `updated_at` ties.
    touched: u64,
}

struct LocalData {
    sessions: BTreeMap<SessionId, StoredSession>,
    next_session_id: SessionId,
    next_touch: u64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_session_id: SessionId(1),
            next_touch: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn touch(&mut self) -> u64 {
        let seq = self.next_touch;
        self.next_touch += 1;
        seq
    }

    fn ordered(&self) -> Vec<&StoredSession> {
        let mut stored: Vec<&StoredSession> = self.sessions.values().collect();
        stored.sort_by(|a, b| {
            b.session
                .summary
                .updated_at
                .cmp(&a.session.summary.updated_at)
                .then(b.touched.cmp(&a.touched))
        });
        stored
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of sessions stored.
    pub fn session_count(&self) -> usize {
        self.data.read().sessions.len()
    }

    /// Check if a session exists.
    pub fn has_session(&self, id: SessionId) -> bool {
        self.data.read().sessions.contains_key(&id)
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::unavailable(
                "Session store is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    fn not_found(id: SessionId, operation: &str) -> RepositoryError {
        RepositoryError::not_found(
            "Session not found",
            ErrorContext::new(operation).for_session(id),
        )
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn list_sessions(&self) -> RepositoryResult<Vec<SessionSummary>> {
        self.check_health("list_sessions")?;
        let data = self.data.read();
        Ok(data
            .ordered()
            .into_iter()
            .map(|stored| stored.session.summary.clone())
            .collect())
    }

    async fn create_session(&self, session: NewSession) -> RepositoryResult<SessionSummary> {
        self.check_health("create_session")?;
        let name = normalize_name(&session.name, "create_session")?;

        let mut data = self.data.write();
        let id = data.next_session_id;
        data.next_session_id = SessionId(id.0 + 1);
        let touched = data.touch();
        let now = Utc::now();

        let summary = SessionSummary {
            id,
            name,
            created_at: now,
            updated_at: now,
            academic_year: normalize_text(session.academic_year),
            notes: normalize_text(session.notes),
            resident_count: session.api_response.residents.len(),
        };
        data.sessions.insert(
            id,
            StoredSession {
                session: Session {
                    summary: summary.clone(),
                    api_response: session.api_response,
                },
                touched,
            },
        );
        Ok(summary)
    }

    async fn get_session(&self, id: SessionId) -> RepositoryResult<Session> {
        self.check_health("get_session")?;
        let data = self.data.read();
        data.sessions
            .get(&id)
            .map(|stored| stored.session.clone())
            .ok_or_else(|| Self::not_found(id, "get_session"))
    }

    async fn latest_session(&self) -> RepositoryResult<Option<Session>> {
        self.check_health("latest_session")?;
        let data = self.data.read();
        Ok(data
            .ordered()
            .first()
            .map(|stored| stored.session.clone()))
    }

    async fn update_session(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> RepositoryResult<SessionSummary> {
        self.check_health("update_session")?;
        let name = update
            .name
            .as_deref()
            .map(|name| normalize_name(name, "update_session"))
            .transpose()?;

        let mut data = self.data.write();
        let touched = data.touch();
        let stored = data
            .sessions
            .get_mut(&id)
            .ok_or_else(|| Self::not_found(id, "update_session"))?;

        let session = &mut stored.session;
        if let Some(name) = name {
            session.summary.name = name;
        }
        if update.notes.is_some() {
            session.summary.notes = normalize_text(update.notes);
        }
        if update.academic_year.is_some() {
            session.summary.academic_year = normalize_text(update.academic_year);
        }
        if let Some(api_response) = update.api_response {
            session.summary.resident_count = api_response.residents.len();
            session.api_response = api_response;
        }
        session.summary.updated_at = Utc::now().max(session.summary.updated_at);
        stored.touched = touched;

        Ok(stored.session.summary.clone())
    }

    async fn delete_session(&self, id: SessionId) -> RepositoryResult<()> {
        self.check_health("delete_session")?;
        let mut data = self.data.write();
        data.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id, "delete_session"))
    }
}
