//! End-to-end workspace flows with a fake solver and an in-memory session store.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use r2s_workspace::db::repositories::LocalRepository;
use r2s_workspace::db::{NewSession, SessionRepository};
use r2s_workspace::models::{ScheduleResult, UploadSlot};
use r2s_workspace::solve::{SolveRequest, SolverOracle};
use r2s_workspace::workspace::{WorkspaceController, WorkspacePhase, WorkspacePreferences};
use r2s_workspace::{WorkspaceError, WorkspaceResult};
use support::{cohort, csv_file, required_files, sample_result, RecordingOracle};

fn controller_with(
    oracle: Arc<RecordingOracle>,
    repo: Arc<LocalRepository>,
) -> WorkspaceController {
    let controller = WorkspaceController::new(oracle).with_sessions(repo);
    for (slot, file) in required_files() {
        controller.set_upload(slot, file);
    }
    controller
}

#[tokio::test]
async fn test_first_solve_then_pinned_resolve() {
    let oracle = Arc::new(RecordingOracle::new());
    let repo = Arc::new(LocalRepository::new());
    let controller = controller_with(oracle.clone(), repo.clone());
    controller.init().await.unwrap();
    assert!(controller.is_persistence_available());
    controller.set_academic_year("2025/2026");

    oracle.push_result(cohort());
    let result = controller.solve().await.unwrap();
    assert_eq!(result.residents.len(), 4);
    assert_eq!(controller.phase(), WorkspacePhase::Ready);
    assert_eq!(controller.selected_index(), Some(0));
    assert_eq!(
        controller.resident_order(),
        vec!["M100001A", "M100004D", "M100002B", "M100003C"]
    );

    let first_request = oracle.last_request().unwrap();
    assert_eq!(first_request.pinned_mcrs().unwrap(), Vec::<String>::new());
    assert!(first_request.previous_response().unwrap().is_none());

    // The first solve was saved automatically and linked.
    let session_id = controller.current_session().expect("auto-saved session");
    let sessions = repo.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].name.starts_with("AY2025/2026 - "));
    assert_eq!(sessions[0].academic_year.as_deref(), Some("2025/2026"));

    // Pin one resident and solve again without new uploads.
    assert!(controller.toggle_pin("M100001A"));
    let mut next = cohort();
    next.statistics = serde_json::json!({"run": 2});
    oracle.push_result(next);
    controller.solve().await.unwrap();

    let request = oracle.last_request().unwrap();
    assert_eq!(request.pinned_mcrs().unwrap(), vec!["M100001A".to_string()]);
    let previous = request.previous_response().unwrap().expect("prior result attached");
    assert_eq!(previous.residents.len(), 4);
    assert_eq!(request.text("max_time_in_minutes"), Some("20"));

    // A pinned re-solve continues the linked session.
    assert_eq!(controller.current_session(), Some(session_id));
    assert_eq!(repo.session_count(), 1);
    assert_eq!(
        controller.active_result().unwrap().statistics["run"],
        serde_json::json!(2)
    );
}

#[tokio::test]
async fn test_missing_inputs_never_reach_the_solver() {
    let oracle = Arc::new(RecordingOracle::new());
    let controller = WorkspaceController::new(oracle.clone());
    controller.set_upload(UploadSlot::Residents, csv_file(UploadSlot::Residents));

    let err = controller.solve().await.unwrap_err();
    match err {
        WorkspaceError::Validation(message) => {
            assert!(message.contains("resident_preferences"));
            assert!(message.contains("postings"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(oracle.requests().is_empty());
    assert_eq!(controller.phase(), WorkspacePhase::Idle);
}

#[tokio::test]
async fn test_transport_failure_keeps_previous_result() {
    let oracle = Arc::new(RecordingOracle::new());
    let controller = controller_with(oracle.clone(), Arc::new(LocalRepository::new()));

    oracle.push_result(cohort());
    controller.solve().await.unwrap();
    controller.select_resident("M100003C").unwrap();

    oracle.push_error(WorkspaceError::transport(Some(500), "Solver crashed"));
    let err = controller.solve().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(controller.phase(), WorkspacePhase::Failed);
    assert!(controller.last_error().unwrap().contains("Solver crashed"));
    assert_eq!(controller.active_result().unwrap().residents.len(), 4);
    assert_eq!(controller.selected_resident().as_deref(), Some("M100003C"));

    // The workspace recovers on the next solve.
    oracle.push_result(cohort());
    controller.solve().await.unwrap();
    assert_eq!(controller.phase(), WorkspacePhase::Ready);
    assert!(controller.last_error().is_none());
}

#[tokio::test]
async fn test_unusable_result_is_rejected() {
    let oracle = Arc::new(RecordingOracle::new());
    let controller = controller_with(oracle.clone(), Arc::new(LocalRepository::new()));

    let mut empty = cohort();
    empty.residents.clear();
    oracle.push_result(empty);

    let err = controller.solve().await.unwrap_err();
    assert!(matches!(err, WorkspaceError::SolveRejected(_)));
    assert_eq!(
        controller.last_error().as_deref(),
        Some("Server returned success=true, residents count=0")
    );
    assert!(controller.active_result().is_none());
    assert_eq!(controller.phase(), WorkspacePhase::Failed);
}

#[tokio::test]
async fn test_without_persistence_solves_still_work() {
    let oracle = Arc::new(RecordingOracle::new());
    let repo = Arc::new(LocalRepository::new());
    repo.set_healthy(false);
    let controller = controller_with(oracle.clone(), repo.clone());
    controller.init().await.unwrap();
    assert!(!controller.is_persistence_available());

    oracle.push_result(cohort());
    controller.solve().await.unwrap();
    assert_eq!(controller.phase(), WorkspacePhase::Ready);
    assert!(controller.current_session().is_none());

    assert!(matches!(
        controller.list_sessions().await.unwrap_err(),
        WorkspaceError::PersistenceUnavailable
    ));
    assert!(matches!(
        controller.save_session("Draft", None).await.unwrap_err(),
        WorkspaceError::PersistenceUnavailable
    ));
}

#[tokio::test]
async fn test_save_load_delete_sessions() {
    let oracle = Arc::new(RecordingOracle::new());
    let repo = Arc::new(LocalRepository::new());
    let controller = controller_with(oracle.clone(), repo.clone());
    controller.init().await.unwrap();

    oracle.push_result(cohort());
    controller.solve().await.unwrap();
    let auto = controller.current_session().unwrap();

    // Saving while linked renames the linked session.
    let saved = controller
        .save_session("  Final draft ", Some("reviewed".to_string()))
        .await
        .unwrap();
    assert_eq!(saved.id, auto);
    assert_eq!(saved.name, "Final draft");
    assert_eq!(saved.notes.as_deref(), Some("reviewed"));
    assert_eq!(repo.session_count(), 1);

    assert!(matches!(
        controller.save_session("   ", None).await.unwrap_err(),
        WorkspaceError::Validation(_)
    ));

    // Another stored session to switch to.
    let other = repo
        .create_session(NewSession::new(
            "Older",
            sample_result(&[("M900001Z", 3), ("M900002Y", 2)]),
        ))
        .await
        .unwrap();

    controller.toggle_pin("M100001A");
    controller.load_session(other.id).await.unwrap();
    assert_eq!(controller.current_session(), Some(other.id));
    assert!(controller.pins().is_empty());
    assert_eq!(controller.selected_resident().as_deref(), Some("M900002Y"));
    assert_eq!(controller.phase(), WorkspacePhase::Ready);

    // Deleting the linked session keeps the result on screen.
    controller.delete_session(other.id).await.unwrap();
    assert!(controller.current_session().is_none());
    assert_eq!(controller.active_result().unwrap().residents.len(), 2);

    let err = controller.delete_session(other.id).await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Repository(ref e) if e.is_not_found()));

    let listed = controller.list_sessions().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, auto);
}

#[tokio::test]
async fn test_startup_restores_latest_session_and_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let prefs_path = dir.path().join("prefs.json");
    let repo = Arc::new(LocalRepository::new());
    repo.create_session(
        NewSession::new("Older", sample_result(&[("M1", 1)]))
            .with_academic_year(Some("2024/2025".to_string())),
    )
    .await
    .unwrap();
    let latest = repo
        .create_session(
            NewSession::new("Latest", cohort()).with_academic_year(Some("2025/2026".to_string())),
        )
        .await
        .unwrap();

    let prefs = WorkspacePreferences {
        selected_resident: Some("M100002B".to_string()),
        pinned: ["M100003C"].into_iter().collect(),
        academic_year: String::new(),
    };
    prefs.save(&prefs_path).unwrap();

    let controller = WorkspaceController::new(Arc::new(RecordingOracle::new()))
        .with_sessions(repo.clone())
        .with_preferences_file(prefs_path.clone());
    controller.init().await.unwrap();

    assert_eq!(controller.current_session(), Some(latest.id));
    assert_eq!(controller.phase(), WorkspacePhase::Ready);
    assert_eq!(controller.selected_resident().as_deref(), Some("M100002B"));
    assert!(controller.pins().contains("M100003C"));
    assert_eq!(controller.academic_year(), "2025/2026");

    // Navigation changes are written back to the preferences file.
    assert_eq!(controller.select_next().as_deref(), Some("M100003C"));
    assert_eq!(controller.select_next().as_deref(), Some("M100003C"));
    let stored = WorkspacePreferences::load(&prefs_path);
    assert_eq!(stored.selected_resident.as_deref(), Some("M100003C"));
    assert_eq!(stored.academic_year, "2025/2026");
}

#[tokio::test]
async fn test_new_upload_discards_active_result() {
    let oracle = Arc::new(RecordingOracle::new());
    let controller = controller_with(oracle.clone(), Arc::new(LocalRepository::new()));
    controller.init().await.unwrap();

    oracle.push_result(cohort());
    controller.solve().await.unwrap();
    assert!(controller.current_session().is_some());

    controller.set_upload(UploadSlot::ResidentLeaves, csv_file(UploadSlot::ResidentLeaves));
    assert!(controller.active_result().is_none());
    assert!(controller.current_session().is_none());
    assert_eq!(controller.phase(), WorkspacePhase::Idle);
    assert!(controller.timetable_csv().is_err());
}

#[tokio::test]
async fn test_deviations_are_sent_with_the_request() {
    let oracle = Arc::new(RecordingOracle::new());
    let controller = WorkspaceController::new(oracle.clone());
    for (slot, file) in required_files() {
        controller.set_upload(slot, file);
    }
    let catalog = ["CVM (NUH)", "GM (TTSH)", "MICU (SGH)", "GRM (TTSH)", "MedComm (TTSH)"];
    controller.apply_configured_defaults(&catalog);
    controller.add_deviation("GRM (TTSH)", 40);
    controller.update_deviation("MICU (SGH)", "3");
    controller.set_time_limit_input("5").unwrap();

    oracle.push_result(cohort());
    controller.solve().await.unwrap();

    let request = oracle.last_request().unwrap();
    let deviations: serde_json::Value =
        serde_json::from_str(request.text("posting_balancing_deviation").unwrap()).unwrap();
    assert_eq!(
        deviations,
        serde_json::json!({"CVM (NUH)": 1, "GRM+MedComm (TTSH)": 15, "MICU (SGH)": 3})
    );
    assert_eq!(request.text("max_time_in_minutes"), Some("5"));
    assert!(controller.set_time_limit_input("0").is_err());
}

// =============================================================================
// Concurrency
// =============================================================================

/// Holds every answer until released.
struct GatedOracle {
    gate: Notify,
    result: ScheduleResult,
}

#[async_trait]
impl SolverOracle for GatedOracle {
    async fn solve(&self, _request: SolveRequest) -> WorkspaceResult<ScheduleResult> {
        self.gate.notified().await;
        Ok(self.result.clone())
    }
}

fn gated_controller() -> (WorkspaceController, Arc<GatedOracle>) {
    let oracle = Arc::new(GatedOracle {
        gate: Notify::new(),
        result: cohort(),
    });
    let controller = WorkspaceController::new(oracle.clone());
    for (slot, file) in required_files() {
        controller.set_upload(slot, file);
    }
    (controller, oracle)
}

#[tokio::test]
async fn test_second_solve_while_processing_is_refused() {
    let (controller, oracle) = gated_controller();

    let (first, second) = tokio::join!(controller.solve(), async {
        assert_eq!(controller.phase(), WorkspacePhase::Processing);
        let refused = controller.solve().await;
        oracle.gate.notify_one();
        refused
    });

    assert!(matches!(second, Err(WorkspaceError::SolveInProgress)));
    assert_eq!(first.unwrap().residents.len(), 4);
    assert_eq!(controller.phase(), WorkspacePhase::Ready);
}

#[tokio::test]
async fn test_response_after_input_change_is_discarded() {
    let (controller, oracle) = gated_controller();

    let (first, second) = tokio::join!(controller.solve(), async {
        controller.set_upload(UploadSlot::Postings, csv_file(UploadSlot::Postings));
        assert_eq!(controller.phase(), WorkspacePhase::Idle);
        // the first call has not answered yet, so a new one may not start
        let refused = controller.solve().await;
        oracle.gate.notify_one();
        refused
    });

    assert!(matches!(first, Err(WorkspaceError::StaleResponse { .. })));
    assert!(matches!(second, Err(WorkspaceError::SolveInProgress)));
    assert!(controller.active_result().is_none());
    assert_eq!(controller.phase(), WorkspacePhase::Idle);

    oracle.gate.notify_one();
    let result = controller.solve().await.unwrap();
    assert_eq!(result.residents.len(), 4);
}

#[tokio::test]
async fn test_cancelled_solve_frees_the_workspace() {
    let (controller, oracle) = gated_controller();

    let timed_out =
        tokio::time::timeout(std::time::Duration::from_millis(20), controller.solve()).await;
    assert!(timed_out.is_err());
    assert_eq!(controller.phase(), WorkspacePhase::Failed);

    oracle.gate.notify_one();
    assert!(controller.solve().await.is_ok());
    assert_eq!(controller.phase(), WorkspacePhase::Ready);
}
