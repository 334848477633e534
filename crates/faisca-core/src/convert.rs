//! Row -> model conversions. Corrupt rows are logged and defaulted rather
//! than failing the whole listing, matching the store's append-only posture.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use faisca_db::models::{MatchRow, MessageRow, NotificationRow, SummaryRow};
use faisca_types::models::{
    ChatSummary, Match, Message, MessageStatus, Notification, NotificationKind,
};

pub(crate) fn parse_uuid(s: &str, context: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}' in {}: {}", s, context, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(s: &str, context: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite defaults store "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' in {}: {}", s, context, e);
            DateTime::default()
        })
}

pub(crate) fn to_match(row: &MatchRow) -> Match {
    Match {
        id: parse_uuid(&row.id, "matches.id"),
        user_a: parse_uuid(&row.user_a, "matches.user_a"),
        user_b: parse_uuid(&row.user_b, "matches.user_b"),
        event_id: parse_uuid(&row.event_id, "matches.event_id"),
        created_at: parse_ts(&row.created_at, "matches.created_at"),
        chat_opened_a: row.chat_opened_a,
        chat_opened_b: row.chat_opened_b,
    }
}

pub(crate) fn to_message(row: &MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "messages.id"),
        chat_id: parse_uuid(&row.chat_id, "messages.chat_id"),
        sender_id: parse_uuid(&row.sender_id, "messages.sender_id"),
        content: row.content.clone(),
        created_at: parse_ts(&row.created_at, "messages.created_at"),
        seq: row.seq,
        status: MessageStatus::parse(&row.status).unwrap_or_else(|| {
            warn!("Corrupt status '{}' on message '{}'", row.status, row.id);
            MessageStatus::Sent
        }),
        client_token: row.client_token.clone(),
    }
}

/// The viewer determines which side of the pair is "the partner".
pub(crate) fn to_summary(row: &SummaryRow, viewer: Uuid) -> ChatSummary {
    let user_a = parse_uuid(&row.user_a, "matches.user_a");
    let user_b = parse_uuid(&row.user_b, "matches.user_b");
    let partner_id = if user_a == viewer { user_b } else { user_a };

    ChatSummary {
        match_id: parse_uuid(&row.match_id, "matches.id"),
        partner_id,
        created_at: parse_ts(&row.created_at, "matches.created_at"),
        last_message: row.last_message.clone(),
        last_message_at: row
            .last_message_at
            .as_deref()
            .map(|ts| parse_ts(ts, "messages.created_at")),
        unread_count: row.unread_count,
    }
}

pub(crate) fn to_notification(row: &NotificationRow) -> Notification {
    Notification {
        id: parse_uuid(&row.id, "notifications.id"),
        user_id: parse_uuid(&row.user_id, "notifications.user_id"),
        kind: NotificationKind::parse(&row.kind).unwrap_or(NotificationKind::Generic),
        ref_id: row.ref_id.as_deref().map(|r| parse_uuid(r, "notifications.ref_id")),
        body: row.body.clone(),
        created_at: parse_ts(&row.created_at, "notifications.created_at"),
        read: row.read,
    }
}
