use std::sync::Arc;

use uuid::Uuid;

use faisca_db::Database;
use faisca_gateway::dispatcher::Dispatcher;
use faisca_types::error::{CoreError, CoreResult};
use faisca_types::events::ChangeEvent;
use faisca_types::models::{Message, MessageStatus};

use crate::{blocking, convert, now_ts};

/// Durable, append-only per-chat message log.
///
/// Senders only ever create rows in `sent`; the delivered/seen transitions
/// are driven by the receiving side and are forward-only in SQL.
#[derive(Clone)]
pub struct MessageStore {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl MessageStore {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Append a message and push the chat-scoped insert event. The stored
    /// row carries the caller's `client_token`, so the optimistic local
    /// entry can be matched against both this ack and the realtime echo —
    /// never by position or timing.
    pub async fn send(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: String,
        client_token: String,
    ) -> CoreResult<Message> {
        self.require_member(chat_id, sender_id).await?;

        let id = Uuid::new_v4();
        let created_at = now_ts();
        let db = self.db.clone();
        let body = content.clone();
        let token = client_token.clone();
        let ts = created_at.clone();
        let seq = blocking(move || {
            db.insert_message(
                &id.to_string(),
                &chat_id.to_string(),
                &sender_id.to_string(),
                &body,
                &token,
                &ts,
            )
        })
        .await?;

        let message = Message {
            id,
            chat_id,
            sender_id,
            content,
            created_at: convert::parse_ts(&created_at, "messages.created_at"),
            seq,
            status: MessageStatus::Sent,
            client_token: Some(client_token),
        };

        self.dispatcher.broadcast(ChangeEvent::MessageInsert {
            message: message.clone(),
        });

        Ok(message)
    }

    /// Bulk-transition every partner-authored message in the chat to seen.
    /// The reader's own messages are never touched. Commutative and
    /// idempotent — concurrent or repeated calls converge.
    pub async fn mark_read(&self, chat_id: Uuid, reader_id: Uuid) -> CoreResult<()> {
        self.require_member(chat_id, reader_id).await?;

        let db = self.db.clone();
        let changed =
            blocking(move || db.mark_read(&chat_id.to_string(), &reader_id.to_string())).await?;

        // Only announce transitions that actually happened; replaying a
        // no-op mark_read stays silent
        if changed > 0 {
            self.dispatcher.broadcast(ChangeEvent::MessageStatusBulk {
                chat_id,
                actor_id: reader_id,
                status: MessageStatus::Seen,
            });
        }

        Ok(())
    }

    /// External delivery signal: sent -> delivered for the recipient's
    /// incoming messages. Seen rows are out of reach by construction.
    pub async fn mark_delivered(&self, chat_id: Uuid, recipient_id: Uuid) -> CoreResult<()> {
        self.require_member(chat_id, recipient_id).await?;

        let db = self.db.clone();
        let changed =
            blocking(move || db.mark_delivered(&chat_id.to_string(), &recipient_id.to_string()))
                .await?;

        if changed > 0 {
            self.dispatcher.broadcast(ChangeEvent::MessageStatusBulk {
                chat_id,
                actor_id: recipient_id,
                status: MessageStatus::Delivered,
            });
        }

        Ok(())
    }

    /// A chat's identity equals its match's identity, so membership is a
    /// match lookup. Gone match == gone chat == NOT_FOUND.
    pub(crate) async fn require_member(&self, chat_id: Uuid, user_id: Uuid) -> CoreResult<()> {
        let db = self.db.clone();
        let row = blocking(move || db.get_match(&chat_id.to_string())).await?;

        match row {
            Some(row) if convert::to_match(&row).has_member(user_id) => Ok(()),
            _ => Err(CoreError::NotFound),
        }
    }
}
