//! Failures of the session store.
//!
//! The in-memory store and the remote session service report through the same
//! [`RepositoryError`]. Its kinds are what callers branch on: the controller
//! turns [`Unavailable`](RepositoryError::Unavailable) into "persistence off",
//! the session server maps every kind onto an HTTP status, and the remote
//! client maps HTTP statuses back with [`RepositoryError::from_status`].

use reqwest::StatusCode;
use std::fmt;

use crate::db::models::SessionId;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Which store call failed, and on what.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Repository operation, e.g. `update_session`.
    pub operation: String,
    pub session_id: Option<SessionId>,
    /// HTTP status answered by the session service.
    pub status: Option<u16>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn for_session(mut self, id: SessionId) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status.as_u16());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.operation)?;
        if let Some(id) = self.session_id {
            write!(f, " session={}", id)?;
        }
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The store cannot be reached, is reported unhealthy or timed out.
    #[error("Session store unavailable: {message} {context}")]
    Unavailable {
        message: String,
        context: ErrorContext,
    },

    #[error("{message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// The store refused the request, e.g. a blank session name.
    #[error("{message} {context}")]
    Invalid {
        message: String,
        context: ErrorContext,
    },

    /// The session service answered with a body this client cannot read.
    #[error("Unexpected response from session store: {message} {context}")]
    BadResponse {
        message: String,
        context: ErrorContext,
    },

    #[error("Session store misconfigured: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Any other failure reported by the store.
    #[error("Session store error: {message} {context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    pub fn unavailable(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Unavailable {
            message: message.into(),
            context,
        }
    }

    pub fn not_found(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    pub fn invalid(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Invalid {
            message: message.into(),
            context,
        }
    }

    pub fn bad_response(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::BadResponse {
            message: message.into(),
            context,
        }
    }

    pub fn configuration(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Configuration {
            message: message.into(),
            context,
        }
    }

    /// Classify a non-success answer from the session service.
    ///
    /// `message` is the server's own error message, kept as is so callers can
    /// show it.
    pub fn from_status(status: StatusCode, message: impl Into<String>, context: ErrorContext) -> Self {
        let message = message.into();
        let context = context.with_status(status);
        match status {
            StatusCode::NOT_FOUND => Self::NotFound { message, context },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Self::Invalid { message, context }
            }
            StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::REQUEST_TIMEOUT => Self::Unavailable { message, context },
            _ => Self::Internal { message, context },
        }
    }

    /// Classify a failure to exchange a request with the session service.
    pub fn from_transport(err: reqwest::Error, context: ErrorContext) -> Self {
        let message = err.to_string();
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Unavailable { message, context }
        } else if err.is_decode() {
            Self::BadResponse { message, context }
        } else {
            Self::Internal { message, context }
        }
    }

    /// The message without its context, as shown to users.
    pub fn message(&self) -> &str {
        match self {
            Self::Unavailable { message, .. }
            | Self::NotFound { message, .. }
            | Self::Invalid { message, .. }
            | Self::BadResponse { message, .. }
            | Self::Configuration { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Unavailable { context, .. }
            | Self::NotFound { context, .. }
            | Self::Invalid { context, .. }
            | Self::BadResponse { context, .. }
            | Self::Configuration { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }

    /// Whether the error means the session does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the store itself is unreachable, as opposed to rejecting a request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
