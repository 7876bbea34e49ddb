//! Workspace-local preferences that survive a restart.
//!
//! Stored as a small JSON file next to the workspace. They are never part of a
//! saved session.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::WorkspaceResult;
use crate::solve::PinSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePreferences {
    #[serde(default)]
    pub selected_resident: Option<String>,
    #[serde(default)]
    pub pinned: PinSet,
    /// Free text, e.g. `2025/2026`. Empty when unset.
    #[serde(default)]
    pub academic_year: String,
}

impl WorkspacePreferences {
    /// Read preferences from `path`.
    ///
    /// A missing or unreadable file yields the defaults; the workspace must
    /// always be able to start.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No preferences at {} ({}), using defaults", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(
                    "Ignoring unreadable preferences file {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Write preferences to `path`, replacing the previous file atomically.
    pub fn save(&self, path: &Path) -> WorkspaceResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
