//! The schedule workspace state machine.
//!
//! ```text
//!  Idle ──begin_solve──▶ Processing ──complete_solve──▶ Ready
//!                            │  ▲                        │
//!                  fail/reject│  └──────begin_solve───────┤
//!                            ▼                           │
//!                          Failed ◀──────────────────────┘
//! ```
//!
//! Every `begin_solve` issues a new token. Only the response for the latest
//! token may be applied; `clear` and `load_session` also advance the token so
//! that a solve started before them can no longer land.
//!
//! The oracle call itself stays outstanding until its answer (stale or not)
//! comes back, and no new solve may start before then.

use log::{debug, info, warn};
use std::sync::Arc;

use super::navigator::ResidentNavigator;
use super::preferences::WorkspacePreferences;
use crate::db::{Session, SessionId};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::ScheduleResult;
use crate::solve::PinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePhase {
    Idle,
    Processing,
    Ready,
    Failed,
}

/// Handle for one outstanding solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveTicket {
    token: u64,
    continuation: bool,
}

impl SolveTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Whether this solve re-optimizes the active result around pinned residents.
    pub fn is_continuation(&self) -> bool {
        self.continuation
    }
}

/// What the caller should do with a freshly adopted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSave {
    /// No session is linked: create one for this result.
    Create,
    /// The result belongs to the linked session already.
    Skip,
}

#[derive(Debug, Clone)]
pub struct ScheduleWorkspaceState {
    phase: WorkspacePhase,
    latest_token: u64,
    in_flight: Option<u64>,
    /// Token of the oracle call still awaiting an answer.
    oracle_call: Option<u64>,
    active: Option<Arc<ScheduleResult>>,
    navigator: ResidentNavigator,
    current_session: Option<SessionId>,
    preferences: WorkspacePreferences,
    last_error: Option<String>,
}

impl Default for ScheduleWorkspaceState {
    fn default() -> Self {
        Self::new(WorkspacePreferences::default())
    }
}

impl ScheduleWorkspaceState {
    pub fn new(preferences: WorkspacePreferences) -> Self {
        Self {
            phase: WorkspacePhase::Idle,
            latest_token: 0,
            in_flight: None,
            oracle_call: None,
            active: None,
            navigator: ResidentNavigator::default(),
            current_session: None,
            preferences,
            last_error: None,
        }
    }

    pub fn phase(&self) -> WorkspacePhase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.phase == WorkspacePhase::Processing
    }

    /// Whether an oracle call is outstanding, even one whose answer will be discarded.
    pub fn is_awaiting_oracle(&self) -> bool {
        self.oracle_call.is_some()
    }

    pub fn active_result(&self) -> Option<&Arc<ScheduleResult>> {
        self.active.as_ref()
    }

    pub fn navigator(&self) -> &ResidentNavigator {
        &self.navigator
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.current_session
    }

    pub fn pins(&self) -> &PinSet {
        &self.preferences.pinned
    }

    pub fn selected_resident(&self) -> Option<&str> {
        self.preferences.selected_resident.as_deref()
    }

    pub fn academic_year(&self) -> &str {
        &self.preferences.academic_year
    }

    pub fn preferences(&self) -> &WorkspacePreferences {
        &self.preferences
    }

    /// Message of the last failed or rejected solve, cleared by the next one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Enter `Processing`.
    ///
    /// A solve with pins over an active result continues the current session;
    /// any other solve starts a fresh one, so the session link is dropped.
    pub fn begin_solve(&mut self) -> WorkspaceResult<SolveTicket> {
        if self.is_processing() || self.is_awaiting_oracle() {
            return Err(WorkspaceError::SolveInProgress);
        }
        self.latest_token += 1;
        let continuation = !self.preferences.pinned.is_empty() && self.active.is_some();
        if !continuation {
            self.current_session = None;
        }
        self.in_flight = Some(self.latest_token);
        self.oracle_call = Some(self.latest_token);
        self.phase = WorkspacePhase::Processing;
        self.last_error = None;
        debug!(
            "Solve {} started (continuation={})",
            self.latest_token, continuation
        );
        Ok(SolveTicket {
            token: self.latest_token,
            continuation,
        })
    }

    fn check_ticket(&mut self, ticket: SolveTicket) -> WorkspaceResult<()> {
        self.release_oracle_call(ticket);
        if self.in_flight != Some(ticket.token) {
            warn!(
                "Discarding response for solve {} (latest is {})",
                ticket.token, self.latest_token
            );
            return Err(WorkspaceError::StaleResponse {
                token: ticket.token,
                latest: self.latest_token,
            });
        }
        Ok(())
    }

    /// Apply the oracle's answer for `ticket`.
    ///
    /// A result that cannot be adopted leaves the previous one active.
    pub fn complete_solve(
        &mut self,
        ticket: SolveTicket,
        result: ScheduleResult,
    ) -> WorkspaceResult<AutoSave> {
        self.check_ticket(ticket)?;
        self.in_flight = None;

        if !result.is_adoptable() {
            let reason = result.rejection_reason();
            warn!("Solve {} rejected: {}", ticket.token, reason);
            self.phase = WorkspacePhase::Failed;
            self.last_error = Some(reason.clone());
            return Err(WorkspaceError::SolveRejected(reason));
        }

        info!(
            "Solve {} adopted with {} residents",
            ticket.token,
            result.residents.len()
        );
        self.adopt(result);
        self.keep_or_reset_selection();
        self.phase = WorkspacePhase::Ready;

        Ok(if self.current_session.is_none() {
            AutoSave::Create
        } else {
            AutoSave::Skip
        })
    }

    /// Record a transport failure for `ticket`. The previous result stays active.
    pub fn fail_solve(&mut self, ticket: SolveTicket, error: &WorkspaceError) -> WorkspaceResult<()> {
        self.check_ticket(ticket)?;
        self.in_flight = None;
        self.phase = WorkspacePhase::Failed;
        self.last_error = Some(error.to_string());
        Ok(())
    }

    /// The oracle call for `ticket` was dropped before it answered.
    pub fn abandon_solve(&mut self, ticket: SolveTicket) {
        self.release_oracle_call(ticket);
        if self.in_flight == Some(ticket.token) {
            warn!("Solve {} abandoned before the solver answered", ticket.token);
            self.in_flight = None;
            self.phase = WorkspacePhase::Failed;
            self.last_error = Some("Solve cancelled".to_string());
        }
    }

    fn release_oracle_call(&mut self, ticket: SolveTicket) {
        if self.oracle_call == Some(ticket.token) {
            self.oracle_call = None;
        }
    }

    /// Replace the workspace with a saved session.
    pub fn load_session(&mut self, session: Session) {
        self.invalidate_in_flight();
        self.current_session = Some(session.id());
        self.adopt(session.api_response);
        self.preferences.pinned.clear();
        self.preferences.selected_resident = self.navigator.first().map(str::to_string);
        self.phase = WorkspacePhase::Ready;
        self.last_error = None;
    }

    /// Bring back the latest session at startup.
    ///
    /// Unlike [`load_session`](Self::load_session) this keeps the persisted
    /// pins and selection, and adopts the session's academic year only when
    /// none is set locally.
    pub fn restore_session(&mut self, session: Session) {
        self.invalidate_in_flight();
        self.current_session = Some(session.id());
        if self.preferences.academic_year.trim().is_empty() {
            if let Some(year) = session.summary.academic_year.clone() {
                self.preferences.academic_year = year;
            }
        }
        self.adopt(session.api_response);
        self.keep_or_reset_selection();
        self.phase = WorkspacePhase::Ready;
        self.last_error = None;
    }

    /// Inputs changed: drop the active result and session link.
    pub fn clear(&mut self) {
        self.invalidate_in_flight();
        self.active = None;
        self.navigator = ResidentNavigator::default();
        self.current_session = None;
        self.phase = WorkspacePhase::Idle;
        self.last_error = None;
    }

    /// Link the active result to `id` after it was saved.
    pub fn record_session(&mut self, id: SessionId) {
        self.current_session = Some(id);
    }

    /// Unlink `id` if it is the current session. The result stays on screen.
    pub fn forget_session(&mut self, id: SessionId) -> bool {
        if self.current_session == Some(id) {
            self.current_session = None;
            true
        } else {
            false
        }
    }

    pub fn toggle_pin(&mut self, mcr: &str) -> bool {
        self.preferences.pinned.toggle(mcr)
    }

    /// Select a resident of the active result.
    pub fn select_resident(&mut self, mcr: &str) -> WorkspaceResult<()> {
        if !self.navigator.contains(mcr) {
            return Err(WorkspaceError::validation(format!(
                "Resident '{}' is not part of the current schedule",
                mcr
            )));
        }
        self.preferences.selected_resident = Some(mcr.to_string());
        Ok(())
    }

    /// Move the selection one resident back. Returns the new selection.
    pub fn select_prev(&mut self) -> Option<&str> {
        let current = self.preferences.selected_resident.as_deref()?;
        let prev = self.navigator.prev(current).to_string();
        self.preferences.selected_resident = Some(prev);
        self.selected_resident()
    }

    /// Move the selection one resident forward. Returns the new selection.
    pub fn select_next(&mut self) -> Option<&str> {
        let current = self.preferences.selected_resident.as_deref()?;
        let next = self.navigator.next(current).to_string();
        self.preferences.selected_resident = Some(next);
        self.selected_resident()
    }

    pub fn set_academic_year(&mut self, academic_year: impl Into<String>) {
        self.preferences.academic_year = academic_year.into();
    }

    fn adopt(&mut self, result: ScheduleResult) {
        self.navigator = ResidentNavigator::from_residents(&result.residents);
        self.active = Some(Arc::new(result));
    }

    fn keep_or_reset_selection(&mut self) {
        let keep = self
            .preferences
            .selected_resident
            .as_deref()
            .is_some_and(|mcr| self.navigator.contains(mcr));
        if !keep {
            self.preferences.selected_resident = self.navigator.first().map(str::to_string);
        }
    }

    fn invalidate_in_flight(&mut self) {
        if self.in_flight.take().is_some() {
            debug!("Invalidating in-flight solve {}", self.latest_token);
        }
        self.latest_token += 1;
    }
}
