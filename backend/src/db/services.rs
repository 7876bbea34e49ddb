//! High-level session service layer.
//!
//! Repository-agnostic operations used by both the workspace and the session
//! server. Input normalization lives here so that every store applies the
//! same rules:
//!
//! - names are trimmed and must not be blank;
//! - `academic_year` and `notes` are trimmed, and blank becomes `None`;
//! - an availability probe that errors counts as "unavailable".
//!
//! # Usage
//!
//! ```no_run
//! use r2s_workspace::db::{services, repositories::LocalRepository, NewSession};
//! use r2s_workspace::models::ScheduleResult;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let result: ScheduleResult = serde_json::from_str(r#"{"success": true}"#)?;
//!     services::create_session(&repo, NewSession::new("Draft", result)).await?;
//!     println!("{} sessions", services::list_sessions(&repo).await?.len());
//!     Ok(())
//! }
//! ```

use log::{info, warn};

use super::models::{NewSession, Session, SessionId, SessionSummary, SessionUpdate};
use super::repository::{ErrorContext, RepositoryError, RepositoryResult, SessionRepository};

/// Trim a session name, rejecting blank ones.
pub fn normalize_name(name: &str, operation: &str) -> RepositoryResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let message = if operation == "update_session" {
            "Session name cannot be empty"
        } else {
            "Session name is required"
        };
        return Err(RepositoryError::invalid(message, ErrorContext::new(operation)));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text; blank becomes `None`.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether session persistence can be used right now.
///
/// Never fails: a probe error is logged and reported as unavailable.
pub async fn is_available<R: SessionRepository + ?Sized>(repo: &R) -> bool {
    match repo.health_check().await {
        Ok(available) => available,
        Err(e) => {
            warn!("Session store availability probe failed: {}", e);
            false
        }
    }
}

pub async fn list_sessions<R: SessionRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<SessionSummary>> {
    repo.list_sessions().await
}

/// Create a session after normalizing its fields.
pub async fn create_session<R: SessionRepository + ?Sized>(
    repo: &R,
    session: NewSession,
) -> RepositoryResult<SessionSummary> {
    let session = NewSession {
        name: normalize_name(&session.name, "create_session")?,
        academic_year: normalize_text(session.academic_year),
        notes: normalize_text(session.notes),
        api_response: session.api_response,
    };
    let summary = repo.create_session(session).await?;
    info!(
        "Created session {} '{}' ({} residents)",
        summary.id, summary.name, summary.resident_count
    );
    Ok(summary)
}

pub async fn get_session<R: SessionRepository + ?Sized>(
    repo: &R,
    id: SessionId,
) -> RepositoryResult<Session> {
    repo.get_session(id).await
}

pub async fn latest_session<R: SessionRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Option<Session>> {
    repo.latest_session().await
}

/// Apply a partial update. A supplied name must not be blank.
pub async fn update_session<R: SessionRepository + ?Sized>(
    repo: &R,
    id: SessionId,
    update: SessionUpdate,
) -> RepositoryResult<SessionSummary> {
    let update = SessionUpdate {
        name: update
            .name
            .as_deref()
            .map(|name| normalize_name(name, "update_session"))
            .transpose()?,
        ..update
    };
    let summary = repo.update_session(id, update).await?;
    info!("Updated session {} '{}'", summary.id, summary.name);
    Ok(summary)
}

pub async fn delete_session<R: SessionRepository + ?Sized>(
    repo: &R,
    id: SessionId,
) -> RepositoryResult<()> {
    repo.delete_session(id).await?;
    info!("Deleted session {}", id);
    Ok(())
}
