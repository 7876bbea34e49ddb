//! Repository trait definitions for session persistence.
//!
//! - [`error`]: Error types for repository operations
//! - [`session`]: CRUD operations over saved sessions
//!
//! Implementations live in [`crate::db::repositories`]: an in-memory store for
//! tests and local use, and an HTTP client for the session service.

pub mod error;
pub mod session;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use session::SessionRepository;
