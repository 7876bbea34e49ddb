//! Schedule result types returned by the solver.
//!
//! The solver owns these records. The workspace only reads them, so every
//! field the solver sends that is not modelled here is kept in `extra` and
//! written back out untouched (sessions and pinned re-solves send the whole
//! result back).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Number of month blocks in one academic year.
pub const MONTH_BLOCKS: u32 = 12;

/// Calendar labels for month blocks 1..=12 (the academic year starts in July).
pub const MONTH_LABELS: [&str; 12] = [
    "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb", "Mar", "Apr", "May", "Jun",
];

/// A complete schedule as produced by one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub success: bool,
    #[serde(default)]
    pub residents: Vec<Resident>,
    #[serde(default)]
    pub resident_history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub statistics: Value,
    /// Solver fields this layer does not interpret (scores, postings, weightages, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScheduleResult {
    /// Whether this result may become the active schedule.
    pub fn is_adoptable(&self) -> bool {
        self.success && !self.residents.is_empty()
    }

    /// Human readable reason for refusing a result, matching what the user sees.
    pub fn rejection_reason(&self) -> String {
        format!(
            "Server returned success={}, residents count={}",
            self.success,
            self.residents.len()
        )
    }

    pub fn resident(&self, mcr: &str) -> Option<&Resident> {
        self.residents.iter().find(|r| r.mcr == mcr)
    }

    pub fn contains_resident(&self, mcr: &str) -> bool {
        self.resident(mcr).is_some()
    }

    /// Current-year posting assignment of one resident, keyed by month block.
    pub fn assignments_for(&self, mcr: &str) -> BTreeMap<u32, String> {
        self.resident_history
            .iter()
            .filter(|row| row.is_current_year() && row.mcr() == mcr)
            .filter_map(|row| {
                let code = row.posting_code().trim();
                let block = row.month_block()?;
                (!code.is_empty()).then(|| (block, code.to_string()))
            })
            .collect()
    }

    /// Per-resident optimisation scores, when the solver reported them.
    pub fn optimisation_scores(&self) -> Option<&Vec<Value>> {
        self.extra.get("optimisation_scores").and_then(Value::as_array)
    }
}

/// One resident of the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    pub mcr: String,
    #[serde(default)]
    pub name: String,
    pub resident_year: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resident {
    /// Posting code of the resident's CCR run, if any.
    pub fn ccr_posting_code(&self) -> Option<&str> {
        self.extra
            .get("ccr_status")
            .and_then(|status| status.get("posting_code"))
            .and_then(Value::as_str)
    }
}

/// One row of a resident's posting history.
///
/// Rows are kept exactly as the solver sent them, nulls and unknown keys
/// included; the accessors read the handful of fields the workspace needs and
/// treat a missing or null value as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryEntry {
    fields: Map<String, Value>,
}

impl HistoryEntry {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn mcr(&self) -> &str {
        self.str_field("mcr")
    }

    pub fn month_block(&self) -> Option<u32> {
        self.get("month_block")
            .and_then(Value::as_u64)
            .and_then(|b| u32::try_from(b).ok())
    }

    pub fn posting_code(&self) -> &str {
        self.str_field("posting_code")
    }

    pub fn is_current_year(&self) -> bool {
        self.bool_field("is_current_year")
    }

    pub fn is_leave(&self) -> bool {
        self.bool_field("is_leave")
    }

    pub fn leave_type(&self) -> &str {
        self.str_field("leave_type")
    }

    fn str_field(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or("")
    }

    fn bool_field(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}
