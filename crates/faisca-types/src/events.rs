use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageStatus, Notification};

/// Row-level change events pushed over the WebSocket gateway.
///
/// Delivery is at-least-once and unordered across change types; consumers
/// must be idempotent under replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid },

    /// A message was appended to a chat
    MessageInsert { message: Message },

    /// Bulk read-state transition: every partner-authored message in the
    /// chat moved forward to `status`. Carries no row ids on purpose —
    /// multiple messages can flip in one batch, so list consumers re-derive
    /// the affected summary instead of patching rows one by one.
    MessageStatusBulk {
        chat_id: Uuid,
        actor_id: Uuid,
        status: MessageStatus,
    },

    /// Both like directions now exist; a match (and its chat) was created
    MatchCreate {
        match_id: Uuid,
        event_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
        created_at: chrono::DateTime<chrono::Utc>,
    },

    /// A match was dissolved by one of its members; the chat is gone
    MatchRemove { match_id: Uuid },

    /// A notification row was created for the receiving user
    NotificationCreate { notification: Notification },

    /// A user's "currently viewing" marker changed (or expired to None)
    PresenceUpdate {
        user_id: Uuid,
        active_chat_id: Option<Uuid>,
    },

    /// Transient typing signal. Never persisted; consumers auto-clear on
    /// a timer rather than waiting for the `false` edge.
    Typing {
        chat_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },
}

impl ChangeEvent {
    /// Returns the chat_id if this event is scoped to a specific chat.
    /// Events that return `None` are global or user-targeted and bypass the
    /// per-connection chat subscription filter.
    pub fn chat_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageInsert { message } => Some(message.chat_id),
            Self::MessageStatusBulk { chat_id, .. } => Some(*chat_id),
            Self::Typing { chat_id, .. } => Some(*chat_id),
            // Ready, MatchCreate/Remove, NotificationCreate, PresenceUpdate
            // are targeted or global
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to chat-scoped events for specific chats.
    /// The server only forwards chat-scoped events (messages, read-state,
    /// typing) for chats the client has subscribed to.
    Subscribe { chat_ids: Vec<Uuid> },

    /// Declare which chat this user is currently viewing (None = none).
    /// Last write wins; only the acting user may set their own marker.
    SetActiveChat { chat_id: Option<Uuid> },

    /// Refresh the presence TTL without changing the active chat
    Heartbeat,

    /// Typing signal for a chat. Senders throttle the `true` edge;
    /// the server relays it to the chat's subscribers.
    Typing { chat_id: Uuid, is_typing: bool },
}
