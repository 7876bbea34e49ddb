//! The workspace controller: inputs, solves and sessions behind one handle.
//!
//! The controller owns the [`ScheduleWorkspaceState`] and the user's inputs
//! behind a mutex that is never held across an `.await`. Solver and session
//! store are injected, so tests drive it with a fake oracle and a
//! [`LocalRepository`](crate::db::LocalRepository).

use chrono::Local;
use log::{info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::preferences::WorkspacePreferences;
use super::state::{AutoSave, ScheduleWorkspaceState, SolveTicket, WorkspacePhase};
use crate::config::WorkspaceConfig;
use crate::db::{
    services, NewSession, RepositoryFactory, SessionId, SessionRepository, SessionSummary,
    SessionUpdate,
};
use crate::deviation::{
    DeviationMap, PostingDeviationConfig, DEFAULT_DEVIATION, DEFAULT_PREFIXES,
};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{ScheduleResult, UploadBundle, UploadFile, UploadSlot, WeightageConfig};
use crate::services::TimetableExport;
use crate::solve::{HttpSolverClient, PinSet, SolveRequestBuilder, SolverOracle, TimeLimit};

/// Everything the user edits between solves.
#[derive(Debug, Clone, Default)]
struct Inputs {
    uploads: UploadBundle,
    weightages: WeightageConfig,
    time_limit: TimeLimit,
    deviations: DeviationMap,
}

struct Inner {
    state: ScheduleWorkspaceState,
    inputs: Inputs,
}

/// An oracle call in progress. Dropping it before [`settle`](Self::settle)
/// (the solve future was cancelled) frees the workspace for the next solve.
struct PendingSolve<'a> {
    inner: &'a Mutex<Inner>,
    ticket: Option<SolveTicket>,
}

impl PendingSolve<'_> {
    fn settle(mut self) {
        self.ticket = None;
    }
}

impl Drop for PendingSolve<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.inner.lock().state.abandon_solve(ticket);
        }
    }
}

/// Name given to sessions created automatically after a solve.
pub fn auto_session_name(academic_year: &str, timestamp: &str) -> String {
    let year = academic_year.trim();
    if year.is_empty() {
        format!("Session - {}", timestamp)
    } else {
        format!("AY{} - {}", year, timestamp)
    }
}

pub struct WorkspaceController {
    inner: Mutex<Inner>,
    oracle: Arc<dyn SolverOracle>,
    sessions: Option<Arc<dyn SessionRepository>>,
    persistence_available: AtomicBool,
    preferences_path: Option<PathBuf>,
    deviation_config: PostingDeviationConfig,
    default_prefixes: Vec<String>,
    default_deviation: u32,
}

impl WorkspaceController {
    /// A controller without session persistence or a preferences file.
    pub fn new(oracle: Arc<dyn SolverOracle>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ScheduleWorkspaceState::default(),
                inputs: Inputs::default(),
            }),
            oracle,
            sessions: None,
            persistence_available: AtomicBool::new(false),
            preferences_path: None,
            deviation_config: PostingDeviationConfig::default(),
            default_prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            default_deviation: DEFAULT_DEVIATION,
        }
    }

    /// Build the solver client and session store described by `config`.
    pub fn from_config(config: &WorkspaceConfig) -> WorkspaceResult<Self> {
        let oracle = HttpSolverClient::new(&config.api.base_url, config.solve_timeout())?;
        let sessions = RepositoryFactory::from_config(config)?;
        Ok(Self::new(Arc::new(oracle))
            .with_sessions(sessions)
            .with_preferences_file(config.workspace.preferences_path.clone())
            .with_deviation_config(config.deviation_config())
            .with_deviation_defaults(
                config.deviation.default_prefixes.clone(),
                config.deviation.default_value,
            )
            .with_time_limit(config.default_time_limit()?))
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionRepository>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Load preferences from `path` and save them back there on every change.
    pub fn with_preferences_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = WorkspacePreferences::load(&path);
        self.inner.get_mut().state = ScheduleWorkspaceState::new(prefs);
        self.preferences_path = Some(path);
        self
    }

    pub fn with_deviation_config(mut self, config: PostingDeviationConfig) -> Self {
        self.deviation_config = config;
        self
    }

    /// Prefixes and value used by [`apply_configured_defaults`](Self::apply_configured_defaults).
    pub fn with_deviation_defaults(mut self, prefixes: Vec<String>, value: u32) -> Self {
        self.default_prefixes = prefixes;
        self.default_deviation = value;
        self
    }

    pub fn with_time_limit(mut self, limit: TimeLimit) -> Self {
        self.inner.get_mut().inputs.time_limit = limit;
        self
    }

    /// Probe persistence and restore the most recent session.
    ///
    /// Never fails because of the session store: an unreachable store only
    /// hides session features.
    pub async fn init(&self) -> WorkspaceResult<()> {
        let Some(repo) = self.sessions.clone() else {
            return Ok(());
        };
        let available = services::is_available(repo.as_ref()).await;
        self.persistence_available.store(available, Ordering::SeqCst);
        info!("Session persistence available: {}", available);
        if !available {
            return Ok(());
        }

        match services::latest_session(repo.as_ref()).await {
            Ok(Some(session)) => {
                let mut inner = self.inner.lock();
                if inner.state.active_result().is_none() && !inner.state.is_processing() {
                    info!("Restoring session {} '{}'", session.id(), session.name());
                    inner.state.restore_session(session);
                    self.persist_preferences(&inner.state);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Could not restore latest session: {}", e),
        }
        Ok(())
    }

    pub fn is_persistence_available(&self) -> bool {
        self.sessions.is_some() && self.persistence_available.load(Ordering::SeqCst)
    }

    fn session_store(&self) -> WorkspaceResult<&Arc<dyn SessionRepository>> {
        match &self.sessions {
            Some(repo) if self.is_persistence_available() => Ok(repo),
            _ => Err(WorkspaceError::PersistenceUnavailable),
        }
    }

    fn persist_preferences(&self, state: &ScheduleWorkspaceState) {
        if let Some(path) = &self.preferences_path {
            if let Err(e) = state.preferences().save(path) {
                warn!("Failed to save preferences to {}: {}", path.display(), e);
            }
        }
    }

    // ==================== Inputs ====================

    /// Choose the file for `slot`. Any active result is discarded.
    pub fn set_upload(&self, slot: UploadSlot, file: UploadFile) {
        let mut inner = self.inner.lock();
        inner.inputs.uploads.set(slot, file);
        inner.state.clear();
    }

    pub fn remove_upload(&self, slot: UploadSlot) -> Option<UploadFile> {
        self.inner.lock().inputs.uploads.remove(slot)
    }

    pub fn uploads(&self) -> UploadBundle {
        self.inner.lock().inputs.uploads.clone()
    }

    pub fn set_weightages(&self, weightages: WeightageConfig) -> WorkspaceResult<()> {
        weightages.validate()?;
        self.inner.lock().inputs.weightages = weightages;
        Ok(())
    }

    pub fn weightages(&self) -> WeightageConfig {
        self.inner.lock().inputs.weightages
    }

    pub fn set_time_limit(&self, limit: TimeLimit) {
        self.inner.lock().inputs.time_limit = limit;
    }

    /// Parse a user-entered time limit; rejects anything below one minute.
    pub fn set_time_limit_input(&self, input: &str) -> WorkspaceResult<TimeLimit> {
        let limit: TimeLimit = input.parse()?;
        self.set_time_limit(limit);
        Ok(limit)
    }

    pub fn time_limit(&self) -> TimeLimit {
        self.inner.lock().inputs.time_limit
    }

    // ==================== Balancing deviations ====================

    pub fn deviation_config(&self) -> &PostingDeviationConfig {
        &self.deviation_config
    }

    pub fn deviations(&self) -> DeviationMap {
        self.inner.lock().inputs.deviations.clone()
    }

    pub fn available_postings<S: AsRef<str>>(&self, all_postings: &[S]) -> Vec<String> {
        let inner = self.inner.lock();
        self.deviation_config
            .available_postings(all_postings, &inner.inputs.deviations)
    }

    pub fn add_deviation(&self, posting: &str, threshold: i64) {
        let mut inner = self.inner.lock();
        inner.inputs.deviations = self
            .deviation_config
            .add(&inner.inputs.deviations, posting, threshold);
    }

    pub fn update_deviation(&self, posting: &str, raw: &str) {
        let mut inner = self.inner.lock();
        inner.inputs.deviations =
            self.deviation_config
                .update_from_input(&inner.inputs.deviations, posting, raw);
    }

    pub fn remove_deviation(&self, posting: &str) {
        let mut inner = self.inner.lock();
        inner.inputs.deviations = self
            .deviation_config
            .remove(&inner.inputs.deviations, posting);
    }

    pub fn apply_default_deviations<S: AsRef<str>, P: AsRef<str>>(
        &self,
        all_postings: &[S],
        prefixes: &[P],
        default: i64,
    ) {
        let mut inner = self.inner.lock();
        inner.inputs.deviations = self.deviation_config.apply_defaults(
            &inner.inputs.deviations,
            all_postings,
            prefixes,
            default,
        );
    }

    /// [`apply_default_deviations`](Self::apply_default_deviations) with the
    /// configured prefixes and value.
    pub fn apply_configured_defaults<S: AsRef<str>>(&self, all_postings: &[S]) {
        self.apply_default_deviations(
            all_postings,
            &self.default_prefixes,
            i64::from(self.default_deviation),
        );
    }

    // ==================== Pins, selection, academic year ====================

    /// Flip the pin of `mcr`; returns whether it is pinned afterwards.
    pub fn toggle_pin(&self, mcr: &str) -> bool {
        let mut inner = self.inner.lock();
        let pinned = inner.state.toggle_pin(mcr);
        self.persist_preferences(&inner.state);
        pinned
    }

    pub fn pins(&self) -> PinSet {
        self.inner.lock().state.pins().clone()
    }

    pub fn select_resident(&self, mcr: &str) -> WorkspaceResult<()> {
        let mut inner = self.inner.lock();
        inner.state.select_resident(mcr)?;
        self.persist_preferences(&inner.state);
        Ok(())
    }

    pub fn select_prev(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let selected = inner.state.select_prev().map(str::to_string);
        self.persist_preferences(&inner.state);
        selected
    }

    pub fn select_next(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let selected = inner.state.select_next().map(str::to_string);
        self.persist_preferences(&inner.state);
        selected
    }

    pub fn selected_resident(&self) -> Option<String> {
        self.inner.lock().state.selected_resident().map(str::to_string)
    }

    /// Index of the selection in navigation order.
    pub fn selected_index(&self) -> Option<usize> {
        let inner = self.inner.lock();
        let selected = inner.state.selected_resident()?;
        inner.state.navigator().position(selected)
    }

    pub fn resident_order(&self) -> Vec<String> {
        self.inner
            .lock()
            .state
            .navigator()
            .ids()
            .map(str::to_string)
            .collect()
    }

    pub fn set_academic_year(&self, academic_year: &str) {
        let mut inner = self.inner.lock();
        inner.state.set_academic_year(academic_year);
        self.persist_preferences(&inner.state);
    }

    pub fn academic_year(&self) -> String {
        self.inner.lock().state.academic_year().to_string()
    }

    // ==================== State ====================

    pub fn phase(&self) -> WorkspacePhase {
        self.inner.lock().state.phase()
    }

    pub fn active_result(&self) -> Option<Arc<ScheduleResult>> {
        self.inner.lock().state.active_result().cloned()
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.inner.lock().state.current_session()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().state.last_error().map(str::to_string)
    }

    /// Render the active result as the timetable CSV.
    pub fn timetable_csv(&self) -> WorkspaceResult<String> {
        let result = self
            .active_result()
            .ok_or_else(|| WorkspaceError::validation("No schedule to export"))?;
        Ok(TimetableExport::from_result(&result).to_csv())
    }

    // ==================== Solving ====================

    /// Run one solve with the current inputs.
    ///
    /// On success the result is active and, unless it continues the linked
    /// session, saved as a new session. Auto-save failures are logged only.
    pub async fn solve(&self) -> WorkspaceResult<Arc<ScheduleResult>> {
        let (ticket, request) = {
            let mut inner = self.inner.lock();
            let has_prior = inner.state.active_result().is_some();
            inner.inputs.uploads.ensure_solvable(has_prior)?;
            inner.inputs.weightages.validate()?;

            let ticket = inner.state.begin_solve()?;
            let Inner { state, inputs } = &mut *inner;
            let built = SolveRequestBuilder::new(
                &inputs.uploads,
                &inputs.weightages,
                state.pins(),
                inputs.time_limit,
            )
            .prior_result(state.active_result().map(|r| r.as_ref()))
            .deviations(&inputs.deviations)
            .build();
            match built {
                Ok(request) => (ticket, request),
                Err(e) => {
                    let _ = state.fail_solve(ticket, &e);
                    return Err(e);
                }
            }
        };

        info!(
            "Submitting solve {} (fields {:?}, fingerprint {})",
            ticket.token(),
            request.field_names(),
            request.fingerprint()
        );
        let pending = PendingSolve {
            inner: &self.inner,
            ticket: Some(ticket),
        };
        let outcome = self.oracle.solve(request).await;
        pending.settle();

        let (auto_save, active, academic_year) = {
            let mut inner = self.inner.lock();
            let applied = match outcome {
                Ok(result) => inner.state.complete_solve(ticket, result),
                Err(e) => {
                    warn!("Solve {} failed: {}", ticket.token(), e);
                    inner.state.fail_solve(ticket, &e)?;
                    Err(e)
                }
            };
            self.persist_preferences(&inner.state);
            let auto_save = applied?;
            let active = inner
                .state
                .active_result()
                .cloned()
                .ok_or_else(|| WorkspaceError::validation("No active schedule after solve"))?;
            (auto_save, active, inner.state.academic_year().to_string())
        };

        if auto_save == AutoSave::Create && self.is_persistence_available() {
            self.auto_save(&active, &academic_year).await;
        }
        Ok(active)
    }

    async fn auto_save(&self, result: &Arc<ScheduleResult>, academic_year: &str) {
        let Ok(repo) = self.session_store() else {
            return;
        };
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let session = NewSession::new(
            auto_session_name(academic_year, &timestamp),
            result.as_ref().clone(),
        )
        .with_academic_year(Some(academic_year.to_string()));

        match services::create_session(repo.as_ref(), session).await {
            Ok(summary) => {
                let mut inner = self.inner.lock();
                // Only link if the result is still the one that was saved.
                let still_active = inner
                    .state
                    .active_result()
                    .is_some_and(|active| Arc::ptr_eq(active, result));
                if still_active && inner.state.current_session().is_none() {
                    inner.state.record_session(summary.id);
                }
            }
            Err(e) => warn!("Auto-save failed: {}", e),
        }
    }

    // ==================== Sessions ====================

    pub async fn list_sessions(&self) -> WorkspaceResult<Vec<SessionSummary>> {
        let repo = self.session_store()?;
        Ok(services::list_sessions(repo.as_ref()).await?)
    }

    /// Save the active result under `name`.
    ///
    /// Updates the linked session when there is one, otherwise creates a new
    /// session and links it.
    pub async fn save_session(
        &self,
        name: &str,
        notes: Option<String>,
    ) -> WorkspaceResult<SessionSummary> {
        let repo = self.session_store()?;
        if name.trim().is_empty() {
            return Err(WorkspaceError::validation("Session name is required"));
        }
        let (result, linked, academic_year) = {
            let inner = self.inner.lock();
            let result = inner
                .state
                .active_result()
                .cloned()
                .ok_or_else(|| WorkspaceError::validation("No schedule to save"))?;
            (
                result,
                inner.state.current_session(),
                inner.state.academic_year().to_string(),
            )
        };

        let summary = match linked {
            Some(id) => {
                let update = SessionUpdate {
                    name: Some(name.to_string()),
                    notes,
                    academic_year: Some(academic_year),
                    api_response: Some(result.as_ref().clone()),
                };
                services::update_session(repo.as_ref(), id, update).await?
            }
            None => {
                let session = NewSession::new(name, result.as_ref().clone())
                    .with_academic_year(Some(academic_year))
                    .with_notes(notes);
                services::create_session(repo.as_ref(), session).await?
            }
        };

        let mut inner = self.inner.lock();
        let still_active = inner
            .state
            .active_result()
            .is_some_and(|active| Arc::ptr_eq(active, &result));
        if still_active {
            inner.state.record_session(summary.id);
        }
        Ok(summary)
    }

    /// Replace the workspace with session `id`. Pins are cleared.
    pub async fn load_session(&self, id: SessionId) -> WorkspaceResult<()> {
        let repo = self.session_store()?;
        let session = services::get_session(repo.as_ref(), id).await?;
        info!("Loading session {} '{}'", session.id(), session.name());
        let mut inner = self.inner.lock();
        inner.state.load_session(session);
        self.persist_preferences(&inner.state);
        Ok(())
    }

    /// Delete session `id`. A failure leaves the workspace untouched.
    pub async fn delete_session(&self, id: SessionId) -> WorkspaceResult<()> {
        let repo = self.session_store()?;
        services::delete_session(repo.as_ref(), id).await?;
        if self.inner.lock().state.forget_session(id) {
            info!("Deleted the linked session {}; result kept", id);
        }
        Ok(())
    }
}
