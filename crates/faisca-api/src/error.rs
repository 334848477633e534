use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use faisca_types::api::ErrorBody;
use faisca_types::error::CoreError;

/// Wraps CoreError so handlers can use `?` and still return the structured
/// JSON body the error taxonomy promises.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::AlreadyLiked => StatusCode::CONFLICT,
            CoreError::SelfLike => StatusCode::BAD_REQUEST,
            CoreError::NotFound => StatusCode::NOT_FOUND,
            CoreError::TransientIo(e) => {
                error!("Transient store failure: {:#}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
            CoreError::StaleWrite => StatusCode::CONFLICT,
        };

        let body = ErrorBody {
            error: self.0.code().to_string(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
