//! Timetable CSV export.
//!
//! One row per resident in result order, month columns Jul..Jun taken from the
//! current-year history rows, every cell double-quoted.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{HistoryEntry, Resident, ScheduleResult, MONTH_BLOCKS, MONTH_LABELS};

/// Attachment name used by the export endpoint.
pub const EXPORT_FILE_NAME: &str = "final_timetable.csv";

const SHAPE_ERROR: &str = "Invalid API response shape";

/// The parts of a schedule the timetable needs.
#[derive(Debug, Clone, Default)]
pub struct TimetableExport {
    residents: Vec<Resident>,
    resident_history: Vec<HistoryEntry>,
    optimisation_scores: Vec<Value>,
}

impl TimetableExport {
    pub fn from_result(result: &ScheduleResult) -> Self {
        Self {
            residents: result.residents.clone(),
            resident_history: result.resident_history.clone(),
            optimisation_scores: result.optimisation_scores().cloned().unwrap_or_default(),
        }
    }

    /// Validate and read an export request body.
    ///
    /// `success` must be true and `residents`/`resident_history` must be
    /// lists; `optimisation_scores`, when present, must be a list too.
    pub fn from_payload(payload: &Value) -> WorkspaceResult<Self> {
        let success = payload.get("success").and_then(Value::as_bool) == Some(true);
        let residents = payload.get("residents").and_then(Value::as_array);
        let history = payload.get("resident_history").and_then(Value::as_array);
        let scores = match payload.get("optimisation_scores") {
            None | Some(Value::Null) => Some(Vec::new()),
            Some(Value::Array(scores)) => Some(scores.clone()),
            Some(_) => None,
        };

        let (Some(residents), Some(history), Some(optimisation_scores)) = (residents, history, scores)
        else {
            return Err(WorkspaceError::validation(SHAPE_ERROR));
        };
        if !success {
            return Err(WorkspaceError::validation(SHAPE_ERROR));
        }

        let residents = residents
            .iter()
            .map(|r| serde_json::from_value::<Resident>(r.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WorkspaceError::validation(format!("{}: {}", SHAPE_ERROR, e)))?;
        // Rows that are not objects are skipped rather than failing the export.
        let resident_history = history
            .iter()
            .filter_map(|row| serde_json::from_value::<HistoryEntry>(row.clone()).ok())
            .collect();

        Ok(Self {
            residents,
            resident_history,
            optimisation_scores,
        })
    }

    /// Render the timetable.
    pub fn to_csv(&self) -> String {
        let mut by_mcr: HashMap<&str, BTreeMap<u32, &str>> = HashMap::new();
        for row in &self.resident_history {
            let mcr = row.mcr().trim();
            let code = row.posting_code().trim();
            let Some(block) = row.month_block() else {
                continue;
            };
            if !row.is_current_year() || mcr.is_empty() || code.is_empty() {
                continue;
            }
            by_mcr.entry(mcr).or_default().insert(block, code);
        }

        let mut header = vec!["mcr", "name", "resident_year", "optimisation_score"];
        header.extend(MONTH_LABELS);
        header.push("ccr_posting_code");

        let mut lines = vec![header.join(",")];
        for (idx, resident) in self.residents.iter().enumerate() {
            let blocks = by_mcr.get(resident.mcr.as_str());
            let mut cells = vec![
                resident.mcr.clone(),
                resident.name.clone(),
                resident.resident_year.to_string(),
                self.optimisation_scores
                    .get(idx)
                    .map(score_cell)
                    .unwrap_or_default(),
            ];
            for block in 1..=MONTH_BLOCKS {
                let code = blocks.and_then(|b| b.get(&block)).copied().unwrap_or("");
                cells.push(code.to_string());
            }
            cells.push(resident.ccr_posting_code().unwrap_or("").to_string());

            let quoted: Vec<String> = cells.iter().map(|cell| quote(cell)).collect();
            lines.push(quoted.join(","));
        }
        lines.join("\n")
    }
}

fn score_cell(score: &Value) -> String {
    match score {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}
