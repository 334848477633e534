use std::sync::Arc;

use uuid::Uuid;

use faisca_db::Database;
use faisca_types::error::{CoreError, CoreResult};
use faisca_types::models::{ChatSummary, Message};

use crate::store::MessageStore;
use crate::{blocking, convert};

/// Maps matches to chat channels: ordered history retrieval, first-open
/// bookkeeping, and the per-user match list with unread counts.
#[derive(Clone)]
pub struct ChatChannelManager {
    db: Arc<Database>,
    store: MessageStore,
}

impl ChatChannelManager {
    pub fn new(db: Arc<Database>, store: MessageStore) -> Self {
        Self { db, store }
    }

    /// All of the user's matches as chat summaries, sorted by last activity
    /// descending, ties broken by match creation time.
    pub async fn list_matches(&self, user_id: Uuid) -> CoreResult<Vec<ChatSummary>> {
        let db = self.db.clone();
        let rows = blocking(move || db.chat_summaries(&user_id.to_string())).await?;

        let mut summaries: Vec<ChatSummary> =
            rows.iter().map(|row| convert::to_summary(row, user_id)).collect();

        summaries.sort_by(|a, b| {
            b.activity_at()
                .cmp(&a.activity_at())
                .then(b.created_at.cmp(&a.created_at))
        });

        Ok(summaries)
    }

    /// Scoped refetch of one summary — the authoritative answer after a
    /// bulk read-state event, cheaper than reloading the whole list.
    pub async fn summary(&self, user_id: Uuid, match_id: Uuid) -> CoreResult<ChatSummary> {
        let db = self.db.clone();
        let row =
            blocking(move || db.chat_summary(&user_id.to_string(), &match_id.to_string())).await?;

        match row {
            Some(row) => Ok(convert::to_summary(&row, user_id)),
            None => Err(CoreError::NotFound),
        }
    }

    /// Open a chat as `user_id`: records the first-open flag for that side
    /// and marks everything from the partner as seen. The caller clears its
    /// local unread count optimistically before this returns.
    pub async fn open_chat(&self, match_id: Uuid, user_id: Uuid) -> CoreResult<()> {
        self.store.require_member(match_id, user_id).await?;

        let db = self.db.clone();
        blocking(move || db.mark_chat_opened(&match_id.to_string(), &user_id.to_string())).await?;

        self.store.mark_read(match_id, user_id).await
    }

    /// Full ordered history of a chat, ascending by (created_at, seq).
    pub async fn get_messages(&self, chat_id: Uuid, caller: Uuid) -> CoreResult<Vec<Message>> {
        self.store.require_member(chat_id, caller).await?;

        let db = self.db.clone();
        let rows = blocking(move || db.get_messages(&chat_id.to_string())).await?;

        Ok(rows.iter().map(convert::to_message).collect())
    }
}
