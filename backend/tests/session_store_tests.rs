//! Session store behaviour through the service layer.

mod support;

use r2s_workspace::db::repositories::LocalRepository;
use r2s_workspace::db::{services, NewSession, RepositoryError, SessionId, SessionUpdate};
use support::sample_result;

fn new_session(name: &str) -> NewSession {
    NewSession::new(name, sample_result(&[("M1", 1), ("M2", 2)]))
}

#[tokio::test]
async fn test_create_normalizes_fields() {
    let repo = LocalRepository::new();
    let summary = services::create_session(
        &repo,
        new_session("  Draft A  ")
            .with_academic_year(Some(" 2025/2026 ".to_string()))
            .with_notes(Some("   ".to_string())),
    )
    .await
    .unwrap();

    assert_eq!(summary.name, "Draft A");
    assert_eq!(summary.academic_year.as_deref(), Some("2025/2026"));
    assert_eq!(summary.notes, None);
    assert_eq!(summary.resident_count, 2);
    assert_eq!(summary.created_at, summary.updated_at);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let repo = LocalRepository::new();
    let err = services::create_session(&repo, new_session("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Invalid { .. }));
    assert!(err.to_string().contains("Session name is required"));
    assert_eq!(repo.session_count(), 0);

    let summary = services::create_session(&repo, new_session("ok")).await.unwrap();
    let err = services::update_session(&repo, summary.id, SessionUpdate::rename(" "))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Session name cannot be empty"));
}

#[tokio::test]
async fn test_list_orders_by_most_recent_update() {
    let repo = LocalRepository::new();
    let a = services::create_session(&repo, new_session("a")).await.unwrap();
    let b = services::create_session(&repo, new_session("b")).await.unwrap();
    let c = services::create_session(&repo, new_session("c")).await.unwrap();

    let ids: Vec<SessionId> = services::list_sessions(&repo)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);

    services::update_session(&repo, a.id, SessionUpdate::rename("a2"))
        .await
        .unwrap();
    let listed = services::list_sessions(&repo).await.unwrap();
    assert_eq!(listed[0].id, a.id);
    assert_eq!(listed[0].name, "a2");

    let latest = services::latest_session(&repo).await.unwrap().unwrap();
    assert_eq!(latest.id(), a.id);
    assert_eq!(latest.api_response.residents.len(), 2);
}

#[tokio::test]
async fn test_update_touches_only_supplied_fields() {
    let repo = LocalRepository::new();
    let created = services::create_session(
        &repo,
        new_session("keep").with_notes(Some("first".to_string())),
    )
    .await
    .unwrap();

    let update = SessionUpdate {
        api_response: Some(sample_result(&[("M9", 3)])),
        ..Default::default()
    };
    let updated = services::update_session(&repo, created.id, update).await.unwrap();
    assert_eq!(updated.name, "keep");
    assert_eq!(updated.notes.as_deref(), Some("first"));
    assert_eq!(updated.resident_count, 1);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(updated.created_at, created.created_at);

    let cleared = services::update_session(
        &repo,
        created.id,
        SessionUpdate {
            notes: Some(String::new()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cleared.notes, None);
}

#[tokio::test]
async fn test_delete_twice_reports_not_found() {
    let repo = LocalRepository::new();
    let summary = services::create_session(&repo, new_session("gone")).await.unwrap();

    services::delete_session(&repo, summary.id).await.unwrap();
    assert!(!repo.has_session(summary.id));

    let err = services::delete_session(&repo, summary.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(services::get_session(&repo, summary.id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_latest_is_none_when_empty() {
    let repo = LocalRepository::new();
    assert!(services::latest_session(&repo).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unhealthy_store() {
    let repo = LocalRepository::new();
    assert!(services::is_available(&repo).await);

    repo.set_healthy(false);
    assert!(!services::is_available(&repo).await);
    let err = services::list_sessions(&repo).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(services::create_session(&repo, new_session("x")).await.is_err());

    repo.set_healthy(true);
    assert!(services::list_sessions(&repo).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ids_are_not_reused() {
    let repo = LocalRepository::new();
    let first = services::create_session(&repo, new_session("1")).await.unwrap();
    services::delete_session(&repo, first.id).await.unwrap();
    let second = services::create_session(&repo, new_session("2")).await.unwrap();
    assert_ne!(first.id, second.id);
}
