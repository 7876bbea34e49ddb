#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use r2s_workspace::models::{ScheduleResult, UploadFile, UploadSlot};
use r2s_workspace::solve::{SolveRequest, SolverOracle};
use r2s_workspace::{WorkspaceError, WorkspaceResult};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A successful result for `(mcr, resident_year)` pairs, two current-year
/// blocks each.
pub fn sample_result(residents: &[(&str, u8)]) -> ScheduleResult {
    serde_json::from_value(sample_result_json(residents)).expect("valid fixture")
}

pub fn sample_result_json(residents: &[(&str, u8)]) -> Value {
    let people: Vec<Value> = residents
        .iter()
        .map(|(mcr, year)| json!({"mcr": mcr, "name": format!("Dr {}", mcr), "resident_year": year}))
        .collect();
    let history: Vec<Value> = residents
        .iter()
        .flat_map(|(mcr, year)| {
            vec![
                json!({"mcr": mcr, "year": year, "month_block": 1, "posting_code": "GM (TTSH)", "is_current_year": true}),
                json!({"mcr": mcr, "year": year, "month_block": 2, "posting_code": "CVM (NUH)", "is_current_year": true}),
            ]
        })
        .collect();
    let scores: Vec<Value> = residents.iter().map(|_| json!(42)).collect();
    json!({
        "success": true,
        "residents": people,
        "resident_history": history,
        "statistics": {"total_residents": residents.len()},
        "optimisation_scores": scores,
    })
}

/// A four-resident cohort spread across years 1 to 3.
pub fn cohort() -> ScheduleResult {
    sample_result(&[
        ("M100002B", 2),
        ("M100001A", 1),
        ("M100003C", 3),
        ("M100004D", 1),
    ])
}

pub fn csv_file(slot: UploadSlot) -> UploadFile {
    UploadFile::csv(
        format!("{}.csv", slot.field_name()),
        format!("header\n{}\n", slot.field_name()),
    )
    .expect("csv fixture")
}

/// The five files a first solve needs.
pub fn required_files() -> Vec<(UploadSlot, UploadFile)> {
    UploadSlot::REQUIRED_FOR_FIRST_SOLVE
        .iter()
        .map(|slot| (*slot, csv_file(*slot)))
        .collect()
}

// =============================================================================
// Fake solver
// =============================================================================

/// A [`SolverOracle`] that records requests and answers from a queue.
#[derive(Default)]
pub struct RecordingOracle {
    responses: Mutex<VecDeque<WorkspaceResult<ScheduleResult>>>,
    requests: Mutex<Vec<SolveRequest>>,
}

impl RecordingOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: ScheduleResult) {
        self.responses.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_error(&self, error: WorkspaceError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<SolveRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<SolveRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SolverOracle for RecordingOracle {
    async fn solve(&self, request: SolveRequest) -> WorkspaceResult<ScheduleResult> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WorkspaceError::transport(None, "no response queued")))
    }
}
