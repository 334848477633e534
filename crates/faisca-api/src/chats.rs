use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use faisca_types::api::SendMessageRequest;

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

/// Full ordered history of a chat, ascending.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.channels.get_messages(chat_id, claims.sub).await?;
    Ok(Json(messages))
}

/// Append a message. The response is the authoritative row, client token
/// included — the ack half of the reconciliation contract (the realtime
/// echo is the other half).
pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .store
        .send(chat_id, claims.sub, req.content, req.client_token)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark everything from the partner as seen.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.mark_read(chat_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delivery receipt: the caller's incoming messages move sent -> delivered.
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.mark_delivered(chat_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
