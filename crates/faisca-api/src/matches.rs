use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

/// The caller's match list with chat summaries, last activity first.
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.channels.list_matches(claims.sub).await?;
    Ok(Json(summaries))
}

/// Scoped refetch of one summary — the reconciliation path after a bulk
/// read-state event, cheaper than reloading the list.
pub async fn summary(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.channels.summary(claims.sub, match_id).await?;
    Ok(Json(summary))
}

/// Open the chat: records the first-open flag and marks partner messages
/// seen. Clients clear their unread count optimistically before this
/// returns.
pub async fn open_chat(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.channels.open_chat(match_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dissolve the match and its chat. Idempotent.
pub async fn unmatch(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.unmatch(match_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
