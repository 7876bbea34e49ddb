//! Session persistence.
//!
//! Saved sessions are reached through the Repository pattern, so the
//! workspace and the session server work against any store:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Workspace controller / session HTTP server             │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - name and free-text normalization                     │
//! │  - availability probing                                 │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  SessionRepository trait (repository/)                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ RemoteRepository │     │ LocalRepository         │
//! │ (session API)    │     │ (in-memory)             │
//! └──────────────────┘     └─────────────────────────┘
//! ```

pub mod factory;
pub mod models;
pub mod repositories;
pub mod repository;
pub mod services;

pub use factory::{RepositoryFactory, RepositoryType};
pub use models::{NewSession, Session, SessionId, SessionSummary, SessionUpdate};
pub use repositories::{LocalRepository, RemoteRepository};
pub use repository::{ErrorContext, RepositoryError, RepositoryResult, SessionRepository};
