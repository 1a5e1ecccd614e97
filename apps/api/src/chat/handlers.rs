use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::chat::run_turn;
use crate::errors::AppError;
use crate::models::{TurnResponse, UserRequest};
use crate::state::AppState;

/// POST /get_jobs
pub async fn handle_get_jobs(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    info!(session_id = %req.session_id, "received message");
    let response = run_turn(&state, &req.session_id, &req.message).await?;
    Ok(Json(response))
}

/// DELETE /sessions/:session_id
/// Resets the conversation; idempotent for unknown ids.
pub async fn handle_clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    info!(session_id = %session_id, "clearing session");
    state.sessions.clear(&session_id).await;
    StatusCode::NO_CONTENT
}
