//! The schedule workspace: state machine, navigation, local preferences and
//! the controller that drives them.

pub mod controller;
pub mod navigator;
pub mod preferences;
pub mod state;

pub use controller::{auto_session_name, WorkspaceController};
pub use navigator::{order, ResidentNavigator};
pub use preferences::WorkspacePreferences;
pub use state::{AutoSave, ScheduleWorkspaceState, SolveTicket, WorkspacePhase};
