//! Error types for workspace operations.
//!
//! Every error is local to the action that raised it; none of them leaves the
//! workspace without an active state to fall back to.

use crate::db::repository::RepositoryError;

/// Result type for workspace operations
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Error type for workspace operations
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Inputs are incomplete or malformed. Reported, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP failure talking to the solver.
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The solver answered but the result cannot be adopted.
    #[error("Solve rejected: {0}")]
    SolveRejected(String),

    /// Session persistence is not reachable; session features are hidden.
    #[error("Session persistence is unavailable")]
    PersistenceUnavailable,

    /// `begin_solve` while another solve is outstanding.
    #[error("A solve is already in progress")]
    SolveInProgress,

    /// A solve response arrived after a newer request was issued.
    #[error("Discarded stale solve response (token {token}, latest {latest})")]
    StaleResponse { token: u64, latest: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkspaceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure came from the network rather than from the inputs.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Repository(e) => e.is_unavailable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for WorkspaceError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        Self::Transport {
            status,
            message: err.to_string(),
        }
    }
}
