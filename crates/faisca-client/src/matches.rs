use std::collections::HashSet;

use uuid::Uuid;

use faisca_types::events::ChangeEvent;
use faisca_types::models::{ChatSummary, MessageStatus};

/// Client-side match list: merges insert events in place and flags
/// summaries for a scoped refetch when a bulk read-state change arrives —
/// never a full-list reload on a table-wide event.
pub struct MatchListState {
    viewer: Uuid,
    entries: Vec<ChatSummary>,
    active_chat: Option<Uuid>,
    /// Summaries invalidated by bulk read-state events, awaiting a scoped
    /// authoritative refetch.
    stale: HashSet<Uuid>,
    /// An event referenced a match this list has never seen; only a full
    /// refetch can disambiguate.
    needs_full_refetch: bool,
}

impl MatchListState {
    pub fn new(viewer: Uuid, initial: Vec<ChatSummary>) -> Self {
        let mut state = Self {
            viewer,
            entries: initial,
            active_chat: None,
            stale: HashSet::new(),
            needs_full_refetch: false,
        };
        state.resort();
        state
    }

    /// Declare which chat the viewer currently has open. Opening a chat
    /// clears its unread count optimistically — the authoritative
    /// confirmation arrives later as a bulk read-state event.
    pub fn open_chat(&mut self, match_id: Uuid) {
        self.active_chat = Some(match_id);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.match_id == match_id) {
            entry.unread_count = 0;
        }
    }

    pub fn close_chat(&mut self) {
        self.active_chat = None;
    }

    pub fn active_chat(&self) -> Option<Uuid> {
        self.active_chat
    }

    /// Merge one realtime change event. Idempotent under replay.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::MessageInsert { message } => {
                let Some(entry) =
                    self.entries.iter_mut().find(|e| e.match_id == message.chat_id)
                else {
                    // Insert for a chat we have never observed — a match
                    // event may still be in flight; refetch to disambiguate
                    self.needs_full_refetch = true;
                    return;
                };

                // Replay guard: an echo of something already summarized
                // must not double-count
                if entry.last_message_at.is_some_and(|at| {
                    at > message.created_at
                        || (at == message.created_at
                            && entry.last_message.as_deref() == Some(&message.content))
                }) {
                    return;
                }

                entry.last_message = Some(message.content.clone());
                entry.last_message_at = Some(message.created_at);
                if message.sender_id != self.viewer && self.active_chat != Some(message.chat_id) {
                    entry.unread_count += 1;
                }
                self.resort();
            }

            ChangeEvent::MessageStatusBulk { chat_id, actor_id, status } => {
                let Some(entry) = self.entries.iter_mut().find(|e| e.match_id == *chat_id) else {
                    return;
                };
                // Our own read-all is locally derivable; everything else
                // may flip several rows at once, so take the authoritative
                // summary instead of guessing
                if *actor_id == self.viewer && *status == MessageStatus::Seen {
                    entry.unread_count = 0;
                }
                self.stale.insert(*chat_id);
            }

            ChangeEvent::MatchCreate { match_id, user_a, user_b, created_at, .. } => {
                if self.entries.iter().any(|e| e.match_id == *match_id) {
                    return;
                }
                let partner_id = if *user_a == self.viewer { *user_b } else { *user_a };
                self.entries.push(ChatSummary {
                    match_id: *match_id,
                    partner_id,
                    created_at: *created_at,
                    last_message: None,
                    last_message_at: None,
                    unread_count: 0,
                });
                self.resort();
            }

            ChangeEvent::MatchRemove { match_id } => {
                self.entries.retain(|e| e.match_id != *match_id);
                self.stale.remove(match_id);
                if self.active_chat == Some(*match_id) {
                    self.active_chat = None;
                }
            }

            _ => {}
        }
    }

    /// Drain the set of summaries awaiting a scoped refetch.
    pub fn take_stale(&mut self) -> Vec<Uuid> {
        self.stale.drain().collect()
    }

    /// Replace one entry with its authoritative refetched summary.
    pub fn apply_refetched(&mut self, summary: ChatSummary) {
        match self.entries.iter_mut().find(|e| e.match_id == summary.match_id) {
            Some(entry) => *entry = summary,
            None => self.entries.push(summary),
        }
        self.resort();
    }

    pub fn needs_full_refetch(&self) -> bool {
        self.needs_full_refetch
    }

    /// Replace everything with a fresh authoritative list.
    pub fn reset(&mut self, entries: Vec<ChatSummary>) {
        self.entries = entries;
        self.stale.clear();
        self.needs_full_refetch = false;
        self.resort();
    }

    /// Entries sorted by last activity descending, ties by match creation.
    pub fn entries(&self) -> &[ChatSummary] {
        &self.entries
    }

    fn resort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.activity_at()
                .cmp(&a.activity_at())
                .then(b.created_at.cmp(&a.created_at))
        });
    }
}
