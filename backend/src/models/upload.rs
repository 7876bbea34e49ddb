//! Raw solver inputs chosen by the user.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{WorkspaceError, WorkspaceResult};

/// One of the six named input files.
///
/// The declaration order is the order slots appear in a solve request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadSlot {
    Residents,
    ResidentHistory,
    ResidentPreferences,
    ResidentSrPreferences,
    Postings,
    ResidentLeaves,
}

impl UploadSlot {
    pub const ALL: [UploadSlot; 6] = [
        UploadSlot::Residents,
        UploadSlot::ResidentHistory,
        UploadSlot::ResidentPreferences,
        UploadSlot::ResidentSrPreferences,
        UploadSlot::Postings,
        UploadSlot::ResidentLeaves,
    ];

    /// Slots that must be present before the first solve of a workspace.
    pub const REQUIRED_FOR_FIRST_SOLVE: [UploadSlot; 5] = [
        UploadSlot::Residents,
        UploadSlot::ResidentPreferences,
        UploadSlot::ResidentSrPreferences,
        UploadSlot::ResidentHistory,
        UploadSlot::Postings,
    ];

    /// Multipart field name.
    pub fn field_name(self) -> &'static str {
        match self {
            UploadSlot::Residents => "residents",
            UploadSlot::ResidentHistory => "resident_history",
            UploadSlot::ResidentPreferences => "resident_preferences",
            UploadSlot::ResidentSrPreferences => "resident_sr_preferences",
            UploadSlot::Postings => "postings",
            UploadSlot::ResidentLeaves => "resident_leaves",
        }
    }
}

impl fmt::Display for UploadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A chosen CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create an upload, rejecting anything that is not named `*.csv`.
    pub fn csv(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> WorkspaceResult<Self> {
        let file_name = file_name.into();
        let is_csv = Path::new(&file_name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            return Err(WorkspaceError::validation(format!(
                "Please upload a CSV file (got '{}')",
                file_name
            )));
        }
        Ok(Self {
            file_name,
            bytes: bytes.into(),
        })
    }

    /// Read a CSV file from disk.
    pub fn read(path: impl AsRef<Path>) -> WorkspaceResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        Self::csv(file_name, bytes)
    }
}

/// The six optional input files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBundle {
    files: BTreeMap<UploadSlot, UploadFile>,
}

impl UploadBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: UploadSlot, file: UploadFile) -> Self {
        self.set(slot, file);
        self
    }

    /// Set a slot, returning the file it replaced.
    pub fn set(&mut self, slot: UploadSlot, file: UploadFile) -> Option<UploadFile> {
        self.files.insert(slot, file)
    }

    pub fn remove(&mut self, slot: UploadSlot) -> Option<UploadFile> {
        self.files.remove(&slot)
    }

    pub fn get(&self, slot: UploadSlot) -> Option<&UploadFile> {
        self.files.get(&slot)
    }

    pub fn contains(&self, slot: UploadSlot) -> bool {
        self.files.contains_key(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Present slots in request order.
    pub fn iter(&self) -> impl Iterator<Item = (UploadSlot, &UploadFile)> {
        self.files.iter().map(|(slot, file)| (*slot, file))
    }

    /// Required slots that are still missing for a first solve.
    pub fn missing_for_first_solve(&self) -> Vec<UploadSlot> {
        UploadSlot::REQUIRED_FOR_FIRST_SOLVE
            .iter()
            .copied()
            .filter(|slot| !self.contains(*slot))
            .collect()
    }

    /// Check that a solve may start.
    ///
    /// A re-solve of an existing result has no requirements because the prior
    /// result stands in for missing raw inputs.
    pub fn ensure_solvable(&self, has_prior_result: bool) -> WorkspaceResult<()> {
        if has_prior_result {
            return Ok(());
        }
        let missing = self.missing_for_first_solve();
        if missing.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = missing.iter().map(|s| s.field_name()).collect();
        Err(WorkspaceError::validation(format!(
            "Missing required input files: {}",
            names.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> UploadFile {
        UploadFile::csv(name, b"a,b\n1,2\n".to_vec()).unwrap()
    }

    #[test]
    fn test_csv_extension_required() {
        assert!(UploadFile::csv("residents.CSV", Vec::new()).is_ok());
        let err = UploadFile::csv("residents.xlsx", Vec::new()).unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation(_)));
        assert!(UploadFile::csv("residents", Vec::new()).is_err());
    }

    #[test]
    fn test_iteration_follows_slot_order() {
        let bundle = UploadBundle::new()
            .with(UploadSlot::ResidentLeaves, file("leave.csv"))
            .with(UploadSlot::Residents, file("residents.csv"))
            .with(UploadSlot::Postings, file("postings.csv"));
        let slots: Vec<UploadSlot> = bundle.iter().map(|(s, _)| s).collect();
        assert_eq!(
            slots,
            vec![UploadSlot::Residents, UploadSlot::Postings, UploadSlot::ResidentLeaves]
        );
    }

    #[test]
    fn test_first_solve_requirements() {
        let mut bundle = UploadBundle::new();
        for slot in UploadSlot::REQUIRED_FOR_FIRST_SOLVE {
            assert!(bundle.ensure_solvable(false).is_err());
            bundle.set(slot, file("x.csv"));
        }
        assert!(bundle.ensure_solvable(false).is_ok());
        assert!(!bundle.contains(UploadSlot::ResidentLeaves));
    }

    #[test]
    fn test_resolve_has_no_requirements() {
        let bundle = UploadBundle::new();
        assert!(bundle.ensure_solvable(true).is_ok());
        let err = bundle.ensure_solvable(false).unwrap_err();
        assert!(err.to_string().contains("residents, resident_preferences"));
    }
}
