//! Repository implementations module.
//!
//! This module contains the implementations of the `SessionRepository` trait:
//! - `local`: In-memory implementation for unit testing and local development
//! - `remote`: HTTP client for the session service
pub mod local;
pub mod remote;

pub use local::LocalRepository;
pub use remote::RemoteRepository;
