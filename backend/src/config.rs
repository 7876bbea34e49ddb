//! Workspace configuration file support.
//!
//! Settings are read from `r2s.toml` and then overridden from the
//! environment:
//!
//! | Variable               | Setting                        |
//! |------------------------|--------------------------------|
//! | `R2S_API_URL`          | `api.base_url`                 |
//! | `R2S_PREFERENCES_PATH` | `workspace.preferences_path`   |
//! | `REPOSITORY_TYPE`      | `repository.type`              |
//! | `HOST` / `PORT`        | `server.host` / `server.port`  |
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api"
//! solve_timeout_secs = 900
//!
//! [repository]
//! type = "remote"
//!
//! [deviation]
//! max_threshold = 15
//! default_prefixes = ["CVM", "MICU", "NL", "RCCM"]
//!
//! [[deviation.pairs]]
//! id = "GRM+MedComm (TTSH)"
//! members = ["GRM (TTSH)", "MedComm (TTSH)"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::db::factory::RepositoryType;
use crate::deviation::{
    default_pairs, CoLocatedPair, PostingDeviationConfig, DEFAULT_DEVIATION, DEFAULT_PREFIXES,
    MAX_THRESHOLD,
};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::solve::TimeLimit;

/// File name searched for by [`WorkspaceConfig::from_default_location`].
pub const CONFIG_FILE_NAME: &str = "r2s.toml";

/// Complete workspace configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
    #[serde(default)]
    pub deviation: DeviationSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Where the solver and the session service live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Solves can run for the full time limit plus overhead.
    #[serde(default = "default_solve_timeout")]
    pub solve_timeout_secs: u64,
}

/// Repository type settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
    #[serde(default = "default_time_limit")]
    pub default_time_limit_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationSettings {
    #[serde(default = "default_max_threshold")]
    pub max_threshold: u32,
    #[serde(default = "default_deviation_value")]
    pub default_value: u32,
    #[serde(default = "default_prefixes")]
    pub default_prefixes: Vec<String>,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<CoLocatedPair>,
}

/// Bind address of the session server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_solve_timeout() -> u64 {
    // 20 minute default limit plus headroom
    1800
}

fn default_repo_type() -> String {
    "remote".to_string()
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("r2s-preferences.json")
}

fn default_time_limit() -> u32 {
    TimeLimit::DEFAULT_MINUTES
}

fn default_max_threshold() -> u32 {
    MAX_THRESHOLD
}

fn default_deviation_value() -> u32 {
    DEFAULT_DEVIATION
}

fn default_prefixes() -> Vec<String> {
    DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            solve_timeout_secs: default_solve_timeout(),
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
        }
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            preferences_path: default_preferences_path(),
            default_time_limit_minutes: default_time_limit(),
        }
    }
}

impl Default for DeviationSettings {
    fn default() -> Self {
        Self {
            max_threshold: default_max_threshold(),
            default_value: default_deviation_value(),
            default_prefixes: default_prefixes(),
            pairs: default_pairs(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl WorkspaceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Returns
    /// * `Ok(WorkspaceConfig)` if successful
    /// * `Err(WorkspaceError::Configuration)` if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> WorkspaceResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            WorkspaceError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> WorkspaceResult<Self> {
        let config: WorkspaceConfig = toml::from_str(content).map_err(|e| {
            WorkspaceError::Configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `r2s.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// # Returns
    /// * `Ok(Some(config))` if found and parsed successfully
    /// * `Ok(None)` if no file exists in any of the locations
    pub fn from_default_location() -> WorkspaceResult<Option<Self>> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Defaults, then the first config file found, then the environment.
    pub fn load() -> WorkspaceResult<Self> {
        let mut config = match Self::from_default_location()? {
            Some(config) => config,
            None => {
                log::info!("No {} found, using default configuration", CONFIG_FILE_NAME);
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply the environment variables listed in the module docs.
    pub fn apply_env_overrides(&mut self) -> WorkspaceResult<()> {
        if let Some(url) = env_value("R2S_API_URL") {
            self.api.base_url = url;
        }
        if let Some(path) = env_value("R2S_PREFERENCES_PATH") {
            self.workspace.preferences_path = PathBuf::from(path);
        }
        if let Some(repo_type) = env_value("REPOSITORY_TYPE") {
            self.repository.repo_type = repo_type;
        }
        if let Some(host) = env_value("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("PORT") {
            self.server.port = port.parse().map_err(|_| {
                WorkspaceError::Configuration(format!("Invalid PORT value '{}'", port))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> WorkspaceResult<()> {
        self.repository_type()?;
        self.default_time_limit()?;
        if self.deviation.max_threshold == 0 {
            return Err(WorkspaceError::Configuration(
                "deviation.max_threshold must be at least 1".to_string(),
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(WorkspaceError::Configuration(
                "api.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> WorkspaceResult<RepositoryType> {
        RepositoryType::from_str(&self.repository.repo_type).map_err(WorkspaceError::Configuration)
    }

    pub fn default_time_limit(&self) -> WorkspaceResult<TimeLimit> {
        TimeLimit::minutes(self.workspace.default_time_limit_minutes).map_err(|_| {
            WorkspaceError::Configuration(
                "workspace.default_time_limit_minutes must be at least 1".to_string(),
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn solve_timeout(&self) -> Duration {
        Duration::from_secs(self.api.solve_timeout_secs)
    }

    pub fn deviation_config(&self) -> PostingDeviationConfig {
        PostingDeviationConfig::new(self.deviation.max_threshold, self.deviation.pairs.clone())
    }

    /// `host:port` for the session server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
