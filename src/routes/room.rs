use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::room_dto::{
    CompleteRequest, GetMessagesQuery, LogEventRequest, MarkReadRequest, RankingsQuery,
    ReadyRequest, RoomStatusResponse, SendMessageRequest,
};
use crate::middleware::auth::Claims;
use crate::models::message::SenderType;
use crate::models::participant::ParticipantView;
use crate::AppState;

const DEFAULT_RANKING_LIMIT: u32 = 10;

#[axum::debug_handler]
pub async fn join(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let student_id = claims.caller_id()?;
    let participant = state.participant_service.join(session_id, student_id).await?;
    Ok(Json(participant).into_response())
}

#[axum::debug_handler]
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(participant_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let student_id = claims.caller_id()?;
    state
        .participant_service
        .heartbeat(participant_id, student_id)
        .await?;
    Ok(StatusCode::OK.into_response())
}

#[axum::debug_handler]
pub async fn set_ready(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(participant_id): Path<Uuid>,
    Json(req): Json<ReadyRequest>,
) -> crate::error::Result<Response> {
    let participant = state.participant_service.get_by_id(participant_id).await?;
    claims.ensure_owns(participant.student_id)?;
    let participant = state
        .participant_service
        .set_ready(participant_id, req.ready)
        .await?;
    Ok(Json(participant).into_response())
}

/// Waiting-room / in-exam poll: session status plus the caller's own
/// participant row with connectivity derived right now. Membership is
/// required; an invited student may poll before their first join.
#[axum::debug_handler]
pub async fn get_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let student_id = claims.caller_id()?;
    let session = state.session_service.get_by_id(session_id).await?;
    let participant = if claims.is_staff() {
        None
    } else {
        state
            .participant_service
            .ensure_member(session_id, student_id)
            .await?
    };
    let unread_messages = state
        .message_service
        .unread_count(session_id, student_id)
        .await?;

    let now = chrono::Utc::now();
    let timeout = crate::liveness::heartbeat_timeout();
    let resp = RoomStatusResponse {
        session_id: session.id,
        status: session.status,
        actual_start_at: session.actual_start_at,
        participant: participant.map(|p| ParticipantView::at(p, now, timeout)),
        unread_messages,
    };
    Ok(Json(resp).into_response())
}

#[axum::debug_handler]
pub async fn log_cheating_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(participant_id): Path<Uuid>,
    Json(req): Json<LogEventRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let participant = state.participant_service.get_by_id(participant_id).await?;
    claims.ensure_owns(participant.student_id)?;
    let event = state
        .cheating_service
        .log_event(participant_id, &req.event_type, req.metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(event)).into_response())
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let sender_id = claims.caller_id()?;
    let sender_type = if claims.is_staff() {
        SenderType::Staff
    } else {
        state
            .participant_service
            .ensure_member(session_id, sender_id)
            .await?;
        SenderType::Student
    };
    let message = state
        .message_service
        .send(session_id, sender_type, sender_id, req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)).into_response())
}

#[axum::debug_handler]
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<GetMessagesQuery>,
) -> crate::error::Result<Response> {
    if !claims.is_staff() {
        state
            .participant_service
            .ensure_member(session_id, claims.caller_id()?)
            .await?;
    }
    let messages = state
        .message_service
        .get_for_session(session_id, query.since)
        .await?;
    Ok(Json(messages).into_response())
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> crate::error::Result<Response> {
    let reader_id = claims.caller_id()?;
    if !claims.is_staff() {
        state
            .participant_service
            .ensure_member(session_id, reader_id)
            .await?;
    }
    let read = state
        .message_service
        .mark_read(session_id, reader_id, req.upto_message_id)
        .await?;
    Ok(Json(read).into_response())
}

#[axum::debug_handler]
pub async fn get_rankings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<RankingsQuery>,
) -> crate::error::Result<Response> {
    query.validate()?;
    state.session_service.get_by_id(session_id).await?;

    let current_student_id = claims.caller_id().ok();
    if !claims.is_staff() {
        let student_id = claims.caller_id()?;
        state
            .participant_service
            .ensure_member(session_id, student_id)
            .await?;
    }

    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT) as usize;
    // Full competitor identifiers are a staff permission; students see
    // anonymized labels for everyone but themselves.
    let rankings = state
        .ranking_service
        .get_rankings(session_id, limit, current_student_id, claims.is_staff())
        .await?;
    Ok(Json(rankings).into_response())
}

#[axum::debug_handler]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(participant_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let participant = state.participant_service.get_by_id(participant_id).await?;
    claims.ensure_owns(participant.student_id)?;
    let participant = state.participant_service.disconnect(participant_id).await?;
    Ok(Json(participant).into_response())
}

/// Links the externally recorded result and marks the participant
/// finished. One-way: a second call conflicts.
#[axum::debug_handler]
pub async fn complete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(participant_id): Path<Uuid>,
    Json(req): Json<CompleteRequest>,
) -> crate::error::Result<Response> {
    let participant = state.participant_service.get_by_id(participant_id).await?;
    claims.ensure_owns(participant.student_id)?;
    let participant = state
        .participant_service
        .mark_completed(participant_id, req.result_id)
        .await?;
    Ok(Json(participant).into_response())
}
