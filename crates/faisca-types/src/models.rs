use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-state of a message. Transitions only move forward:
/// sent -> delivered -> seen. The SQL layer enforces this; the enum
/// ordering lets in-memory consumers apply the same guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Seen,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Seen => "seen",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "seen" => Some(Self::Seen),
            _ => None,
        }
    }
}

/// A directed like edge, scoped to an event. Unique per (from, to, event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_match: bool,
}

/// A mutual match. `user_a < user_b` (canonical order); the chat channel
/// for the pair shares this id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub chat_opened_a: bool,
    pub chat_opened_b: bool,
}

impl Match {
    pub fn partner_of(&self, user: Uuid) -> Option<Uuid> {
        if user == self.user_a {
            Some(self.user_b)
        } else if user == self.user_b {
            Some(self.user_a)
        } else {
            None
        }
    }

    pub fn has_member(&self, user: Uuid) -> bool {
        self.partner_of(user).is_some()
    }
}

/// Outcome of a like: either the edge is one-sided for now, or it
/// completed a mutual pair and a match was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LikeOutcome {
    Pending,
    Matched { match_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Insertion sequence, the tiebreaker for equal timestamps.
    pub seq: i64,
    pub status: MessageStatus,
    /// Client-generated correlation id: lets the sender match the stored
    /// row against its optimistic local entry on both the synchronous ack
    /// and the realtime echo.
    pub client_token: Option<String>,
}

/// Derived per-match chat listing entry. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub match_id: Uuid,
    pub partner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u32,
}

impl ChatSummary {
    /// Sort key for the match list: last activity, falling back to match
    /// creation for chats with no messages yet.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// A mutually-eligible match candidate at an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub user_id: Uuid,
    pub event_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Match,
    Message,
    Generic,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Match => "match",
            Self::Message => "message",
            Self::Generic => "generic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "match" => Some(Self::Match),
            "message" => Some(Self::Message),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    /// The entity this notification points at (match id, event id, ...).
    pub ref_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}
