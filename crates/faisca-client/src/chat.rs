use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use faisca_types::events::ChangeEvent;
use faisca_types::models::Message;

/// An optimistic local send awaiting its acknowledgement.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub client_token: String,
    pub content: String,
    pub queued_at: DateTime<Utc>,
}

/// One open chat's client-side view: confirmed history plus optimistic
/// sends, reconciled against acks and the realtime stream.
///
/// At most one outstanding send per client token; issuing a second send
/// with the same token before the first resolves is a programmer error.
pub struct ChatState {
    chat_id: Uuid,
    viewer: Uuid,
    messages: Vec<Message>,
    pending: Vec<PendingSend>,
    known_ids: HashSet<Uuid>,
    /// Raised when the stream referenced state this view has not observed;
    /// the owner should refetch the history and call `reset`.
    needs_refetch: bool,
    /// Set when the match behind this chat was dissolved; all local state
    /// for the id should be dropped.
    closed: bool,
}

impl ChatState {
    pub fn new(chat_id: Uuid, viewer: Uuid, history: Vec<Message>) -> Self {
        let known_ids = history.iter().map(|m| m.id).collect();
        Self {
            chat_id,
            viewer,
            messages: history,
            pending: Vec::new(),
            known_ids,
            needs_refetch: false,
            closed: false,
        }
    }

    /// Record an optimistic send. The content is displayed immediately and
    /// reconciled (or rolled back) by token later.
    pub fn push_pending(&mut self, client_token: &str, content: &str) {
        if self.pending.iter().any(|p| p.client_token == client_token) {
            // One outstanding reconciliation per token — not supported
            warn!("Duplicate outstanding client token '{}', ignoring", client_token);
            return;
        }
        self.pending.push(PendingSend {
            client_token: client_token.to_string(),
            content: content.to_string(),
            queued_at: Utc::now(),
        });
    }

    /// Merge the synchronous acknowledgement for a pending send.
    pub fn confirm(&mut self, client_token: &str, message: Message) {
        self.pending.retain(|p| p.client_token != client_token);
        self.insert_message(message);
    }

    /// Roll back a failed send (TRANSIENT_IO). Returns the original content
    /// so the caller can preserve it for resubmission.
    pub fn rollback(&mut self, client_token: &str) -> Option<String> {
        let idx = self.pending.iter().position(|p| p.client_token == client_token)?;
        Some(self.pending.remove(idx).content)
    }

    /// Merge one realtime change event. Idempotent under replay; events for
    /// other chats are ignored.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::MessageInsert { message } => {
                if message.chat_id != self.chat_id {
                    return;
                }
                // The echo of our own optimistic send resolves by token,
                // never by position or timing. Only rows we authored can
                // settle one of our tokens — a partner's token namespace
                // is not ours.
                if message.sender_id == self.viewer {
                    if let Some(token) = &message.client_token {
                        self.pending.retain(|p| &p.client_token != token);
                    }
                }
                self.insert_message(message.clone());
            }

            ChangeEvent::MessageStatusBulk { chat_id, actor_id, status } => {
                if *chat_id != self.chat_id {
                    return;
                }
                // The actor's transition covers every message they did not
                // author. Forward-only: replays and stale events can't
                // regress a status.
                for msg in &mut self.messages {
                    if msg.sender_id != *actor_id && msg.status < *status {
                        msg.status = *status;
                    }
                }
            }

            ChangeEvent::MatchRemove { match_id } if *match_id == self.chat_id => {
                self.closed = true;
                self.messages.clear();
                self.pending.clear();
                self.known_ids.clear();
            }

            _ => {}
        }
    }

    /// Ordered view: confirmed history ascending by (created_at, seq).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> &[PendingSend] {
        &self.pending
    }

    pub fn needs_refetch(&self) -> bool {
        self.needs_refetch
    }

    /// The transport observed a gap (lagged receiver, reconnect). Local
    /// state can no longer be trusted to be complete; the owner should
    /// refetch and `reset`.
    pub fn mark_stale(&mut self) {
        self.needs_refetch = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Replace the confirmed history with a fresh authoritative fetch.
    /// Pending sends survive — they reconcile against later events.
    pub fn reset(&mut self, history: Vec<Message>) {
        self.known_ids = history.iter().map(|m| m.id).collect();
        self.messages = history;
        self.needs_refetch = false;
    }

    /// Insert keeping (created_at, seq) order. Replayed ids are dropped:
    /// the stream is at-least-once, the view is exactly-once.
    fn insert_message(&mut self, message: Message) {
        if self.closed {
            return;
        }
        if !self.known_ids.insert(message.id) {
            return;
        }

        // A row arriving with a lower seq than something we already show
        // means we observed the stream out of order relative to a fetch;
        // position it correctly anyway.
        let key = (message.created_at, message.seq);
        let idx = self
            .messages
            .partition_point(|m| (m.created_at, m.seq) <= key);
        self.messages.insert(idx, message);
    }
}
