use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use faisca_types::events::ChangeEvent;

/// How long a typing indicator stays lit after the last `true` event.
/// The clear is timer-based on purpose: a dropped "stopped typing" event
/// must not leave the indicator stuck.
pub const TYPING_CLEAR_AFTER: Duration = Duration::from_secs(3);

/// Consumer-side typing indicators for one chat.
///
/// Each `true` event arms a per-user deadline; expired deadlines are purged
/// whenever the state is read. Dropping the watcher drops every deadline
/// with it — nothing outlives the owning context.
pub struct TypingWatcher {
    chat_id: Uuid,
    deadlines: HashMap<Uuid, Instant>,
}

impl TypingWatcher {
    pub fn new(chat_id: Uuid) -> Self {
        Self {
            chat_id,
            deadlines: HashMap::new(),
        }
    }

    /// Merge one realtime event. Non-typing events and other chats are
    /// ignored.
    pub fn apply(&mut self, event: &ChangeEvent) {
        let ChangeEvent::Typing { chat_id, user_id, is_typing } = event else {
            return;
        };
        if *chat_id != self.chat_id {
            return;
        }

        if *is_typing {
            self.deadlines.insert(*user_id, Instant::now() + TYPING_CLEAR_AFTER);
        } else {
            self.deadlines.remove(user_id);
        }
    }

    /// Users currently typing in this chat. Purges expired entries.
    pub fn typing_users(&mut self) -> Vec<Uuid> {
        let now = Instant::now();
        self.deadlines.retain(|_, deadline| *deadline > now);
        self.deadlines.keys().copied().collect()
    }

    /// The next moment an indicator will expire, for callers that want to
    /// schedule a redraw instead of polling.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }
}
