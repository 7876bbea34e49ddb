//! # R2S Workspace
//!
//! Client-side workspace controller for the R2S residency rotation planner.
//!
//! A remote solver turns residents, postings, history, preferences and leave
//! into a complete schedule. This crate prepares what goes to the solver and
//! manages what comes back:
//!
//! - **Solve requests**: assemble the multipart request from optional input
//!   files, weightages, a time limit, pinned residents and the prior result
//! - **Incremental re-solve**: pin residents so their assignments are kept
//!   while everything else is re-optimized
//! - **Balancing deviations**: per-posting thresholds with shared keys for
//!   co-located posting pairs
//! - **Sessions**: save, list, load and delete named schedule snapshots
//!
//! ## Architecture
//!
//! - [`workspace`]: the state machine, resident navigation, local preferences
//!   and the [`WorkspaceController`](workspace::WorkspaceController)
//! - [`solve`]: request assembly and the solver client
//! - [`deviation`]: the posting deviation editor
//! - [`db`]: session persistence, repository pattern
//! - [`services`]: timetable CSV export
//! - [`http`]: Axum-based session server (feature `http-server`)
//! - [`config`]: `r2s.toml` and environment settings

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api_client;
pub mod config;
pub mod db;
pub mod deviation;
pub mod error;
pub mod models;
pub mod services;
pub mod solve;
pub mod workspace;

#[cfg(feature = "http-server")]
pub mod http;

pub use error::{WorkspaceError, WorkspaceResult};
