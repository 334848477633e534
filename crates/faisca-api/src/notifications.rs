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

/// The merged notification feed, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state.feed.list(claims.sub).await?;
    Ok(Json(notifications))
}

/// Idempotent single-notification read marker.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.feed.mark_read(id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Idempotent read-all.
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.feed.mark_all_read(claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
