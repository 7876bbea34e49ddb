//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! session service layer for business logic.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

use super::dto::{
    DbStatusResponse, HealthResponse, LatestSessionResponse, Session, SessionDeletedResponse,
    SessionListResponse, SessionSavedResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::db::{NewSession, SessionId, SessionUpdate};
use crate::models::ScheduleResult;
use crate::services::{TimetableExport, EXPORT_FILE_NAME};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let store = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_store: store,
    }))
}

/// GET /api/db-status
///
/// Whether session persistence is usable. Never fails.
pub async fn db_status(State(state): State<AppState>) -> Json<DbStatusResponse> {
    Json(DbStatusResponse {
        available: db_services::is_available(state.repository.as_ref()).await,
    })
}

// =============================================================================
// Sessions
// =============================================================================

/// GET /api/sessions
///
/// Summaries only, most recently updated first.
pub async fn list_sessions(State(state): State<AppState>) -> HandlerResult<SessionListResponse> {
    let sessions = db_services::list_sessions(state.repository.as_ref()).await?;
    Ok(Json(SessionListResponse { sessions }))
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionSavedResponse>), AppError> {
    let Json(body) = body?;
    let session = parse_new_session(&body)?;
    let summary = db_services::create_session(state.repository.as_ref(), session).await?;
    Ok((
        StatusCode::OK,
        Json(SessionSavedResponse {
            success: true,
            session: summary,
        }),
    ))
}

/// GET /api/sessions/latest
pub async fn latest_session(State(state): State<AppState>) -> HandlerResult<LatestSessionResponse> {
    let session = db_services::latest_session(state.repository.as_ref()).await?;
    Ok(Json(LatestSessionResponse { session }))
}

/// GET /api/sessions/{session_id}
///
/// The full session including its stored result.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> HandlerResult<Session> {
    let session = db_services::get_session(state.repository.as_ref(), SessionId(session_id)).await?;
    Ok(Json(session))
}

/// PUT /api/sessions/{session_id}
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResult<SessionSavedResponse> {
    let Json(body) = body?;
    let update = parse_update(&body)?;
    let summary =
        db_services::update_session(state.repository.as_ref(), SessionId(session_id), update)
            .await?;
    Ok(Json(SessionSavedResponse {
        success: true,
        session: summary,
    }))
}

/// DELETE /api/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> HandlerResult<SessionDeletedResponse> {
    db_services::delete_session(state.repository.as_ref(), SessionId(session_id)).await?;
    Ok(Json(SessionDeletedResponse {
        success: true,
        message: "Session deleted".to_string(),
    }))
}

// =============================================================================
// Export
// =============================================================================

/// POST /api/download-csv
///
/// Render a result as the timetable CSV attachment.
pub async fn download_csv(body: Result<Json<Value>, JsonRejection>) -> Result<Response, AppError> {
    let Json(body) = body?;
    let csv = TimetableExport::from_payload(&body)?.to_csv();
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        csv,
    )
        .into_response())
}

// =============================================================================
// Request parsing
// =============================================================================

fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::BadRequest("Request body must be a JSON object".to_string()))
}

/// Free text as sent by the dashboard; `null` clears the field.
fn text_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn schedule_field(value: Option<&Value>) -> Result<ScheduleResult, AppError> {
    match value {
        Some(value @ Value::Object(map)) if !map.is_empty() => {
            serde_json::from_value(value.clone()).map_err(|e| {
                AppError::BadRequest(format!("api_response is not a schedule result: {}", e))
            })
        }
        _ => Err(AppError::BadRequest("api_response is required".to_string())),
    }
}

fn parse_new_session(body: &Value) -> Result<NewSession, AppError> {
    let body = as_object(body)?;
    let name = body.get("name").map(text_field).unwrap_or_default();
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Session name is required".to_string()));
    }
    let api_response = schedule_field(body.get("api_response"))?;
    Ok(NewSession::new(name, api_response)
        .with_academic_year(body.get("academic_year").map(text_field))
        .with_notes(body.get("notes").map(text_field)))
}

fn parse_update(body: &Value) -> Result<SessionUpdate, AppError> {
    let body = as_object(body)?;
    let api_response = match body.get("api_response") {
        None => None,
        Some(value) => Some(schedule_field(Some(value))?),
    };
    Ok(SessionUpdate {
        name: body.get("name").map(text_field),
        notes: body.get("notes").map(text_field),
        academic_year: body.get("academic_year").map(text_field),
        api_response,
    })
}
