use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use faisca_types::api::{AttendanceRequest, LikeRequest};

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

/// Record a directed like. 201 with `{"status":"pending"}` or
/// `{"status":"matched","match_id":...}`; a duplicate like comes back as
/// 409 ALREADY_LIKED — informational, the edge already exists.
pub async fn like(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.registry.like(claims.sub, req.to_user, event_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Withdraw a one-sided like. Idempotent; mutual edges are immutable.
pub async fn retract_like(
    State(state): State<AppState>,
    Path((event_id, to_user)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.retract_like(claims.sub, to_user, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mutually-eligible candidates for the caller at this event.
pub async fn candidates(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let candidates = state.registry.candidates(event_id, claims.sub).await?;
    Ok(Json(candidates))
}

/// Opt in or out of the "who else is here" layer for an event.
pub async fn set_attendance(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AttendanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry.set_attendance(claims.sub, event_id, req.visible).await?;
    Ok(StatusCode::NO_CONTENT)
}
