use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared across faisca-api (REST middleware) and faisca-gateway
/// (WebSocket Identify). The auth collaborator mints these; this system only
/// validates and consumes the caller id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Likes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeRequest {
    pub to_user: Uuid,
}

// -- Attendance --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceRequest {
    /// Whether the caller opts into the "who else is here" match layer
    pub visible: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    /// Client-generated correlation id, echoed on the ack and the realtime
    /// insert event. One outstanding send per token.
    pub client_token: String,
}

// -- Errors --

/// JSON error body returned by every handler on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
