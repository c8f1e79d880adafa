use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::dto::staff_dto::{CheatingSummaryResponse, StartSessionRequest};
use crate::AppState;

/// Lazily creates the room for an assignment, or returns the live one.
#[axum::debug_handler]
pub async fn get_or_create_session(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let session = state.session_service.get_or_create(assignment_id).await?;
    Ok(Json(session).into_response())
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    body: Option<Json<StartSessionRequest>>,
) -> crate::error::Result<Response> {
    let force_start = body.map(|Json(req)| req.force_start).unwrap_or(false);
    let session = state.session_service.start(session_id, force_start).await?;
    Ok(Json(session).into_response())
}

#[axum::debug_handler]
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let session = state.session_service.end(session_id).await?;
    Ok(Json(session).into_response())
}

/// Monitoring snapshot: session, participants with live connectivity,
/// cheating events.
#[axum::debug_handler]
pub async fn get_session_state(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let snapshot = state.session_service.get_state(session_id).await?;
    Ok(Json(snapshot).into_response())
}

#[axum::debug_handler]
pub async fn kick_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let participant = state.participant_service.kick(participant_id).await?;
    Ok(Json(participant).into_response())
}

#[axum::debug_handler]
pub async fn cheating_summary(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    // 404 for unknown sessions instead of an empty summary
    state.session_service.get_by_id(session_id).await?;
    let counts_by_type = state.cheating_service.count_by_type(session_id).await?;
    let total: i64 = counts_by_type.values().sum();
    Ok(Json(CheatingSummaryResponse {
        session_id,
        counts_by_type,
        total,
    })
    .into_response())
}
