//! Axum route handlers for the Interviews API.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::interviews::lifecycle::CreateInterviewRequest;
use crate::interviews::webhook::WebhookAck;
use crate::models::interview::Interview;
use crate::state::AppState;

/// GET /api/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
) -> Result<Json<Vec<Interview>>, AppError> {
    Ok(Json(state.interviews.list().await?))
}

/// POST /api/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    payload: Result<Json<CreateInterviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Interview>), AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;
    let interview = state.interviews.create(request).await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

/// GET /api/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Interview>, AppError> {
    Ok(Json(state.interviews.get(interview_id(id)?).await?))
}

/// POST /api/interviews/:id/start-call
pub async fn handle_start_call(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Interview>, AppError> {
    Ok(Json(state.interviews.start_call(interview_id(id)?).await?))
}

fn interview_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::Validation(format!("Invalid interview id: {e}")))
}

/// POST /api/webhook
///
/// Always answers 200; the outcome is in the body. The body is read raw so a
/// malformed payload is acknowledged as ignored instead of rejected.
pub async fn handle_call_webhook(State(state): State<AppState>, body: Bytes) -> Json<WebhookAck> {
    Json(state.interviews.handle_call_completion(&body).await)
}
