//! Repository factory for dependency injection.
//!
//! This module provides utilities for creating session repositories based on
//! runtime configuration.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::repositories::{LocalRepository, RemoteRepository};
use super::repository::{ErrorContext, RepositoryError, RepositoryResult, SessionRepository};
use crate::config::WorkspaceConfig;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// HTTP client for the session service
    Remote,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("remote", "http", "local", "memory")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "http" => Ok(Self::Remote),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. Defaults to Remote when unset or unparseable.
    pub fn from_env() -> Self {
        std::env::var("REPOSITORY_TYPE")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(Self::Remote)
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```no_run
/// use r2s_workspace::config::WorkspaceConfig;
/// use r2s_workspace::db::RepositoryFactory;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = WorkspaceConfig::load()?;
/// let repo = RepositoryFactory::from_config(&config)?;
/// # let _ = repo;
/// # Ok(())
/// # }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    pub fn create(
        repo_type: RepositoryType,
        config: &WorkspaceConfig,
    ) -> RepositoryResult<Arc<dyn SessionRepository>> {
        match repo_type {
            RepositoryType::Remote => {
                let remote =
                    Self::create_remote(&config.api.base_url, config.request_timeout())?;
                Ok(remote as Arc<dyn SessionRepository>)
            }
            RepositoryType::Local => Ok(Self::create_local()),
        }
    }

    /// Create a client for the session service at `base_url`.
    pub fn create_remote(
        base_url: &str,
        timeout: Duration,
    ) -> RepositoryResult<Arc<RemoteRepository>> {
        Ok(Arc::new(RemoteRepository::new(base_url, timeout)?))
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn SessionRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create the repository named by `repository.type` in `config`.
    pub fn from_config(config: &WorkspaceConfig) -> RepositoryResult<Arc<dyn SessionRepository>> {
        let repo_type = config.repository_type().map_err(|e| {
            RepositoryError::configuration(
                e.to_string(),
                ErrorContext::new("create_repository"),
            )
        })?;
        Self::create(repo_type, config)
    }

    /// Create a repository from `REPOSITORY_TYPE` and default settings.
    pub fn from_env() -> RepositoryResult<Arc<dyn SessionRepository>> {
        let mut config = WorkspaceConfig::default();
        if let Err(e) = config.apply_env_overrides() {
            return Err(RepositoryError::configuration(
                e.to_string(),
                ErrorContext::new("create_repository"),
            ));
        }
        Self::create(RepositoryType::from_env(), &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_type() {
        assert_eq!("local".parse::<RepositoryType>(), Ok(RepositoryType::Local));
        assert_eq!(" Remote ".parse::<RepositoryType>(), Ok(RepositoryType::Remote));
        assert_eq!("http".parse::<RepositoryType>(), Ok(RepositoryType::Remote));
        assert!("postgres".parse::<RepositoryType>().is_err());
    }

    #[tokio::test]
    async fn test_create_local() {
        let config = WorkspaceConfig::default();
        let repo = RepositoryFactory::create(RepositoryType::Local, &config).unwrap();
        assert!(repo.health_check().await.unwrap());
        assert!(repo.list_sessions().await.unwrap().is_empty());
    }
}
