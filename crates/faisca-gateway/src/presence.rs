use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use faisca_types::events::ChangeEvent;

use crate::dispatcher::Dispatcher;

/// A record with no heartbeat for this long is considered stale and expired
/// by the sweeper. Sits well above the 15s gateway ping so a live connection
/// always refreshes in time.
pub const PRESENCE_TTL: Duration = Duration::from_secs(30);

/// How often the background sweeper looks for stale records.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Minimum gap between relayed `is_typing: true` events per (chat, user).
pub const TYPING_THROTTLE: Duration = Duration::from_secs(2);

struct PresenceEntry {
    tx: watch::Sender<Option<Uuid>>,
    updated_at: Instant,
    /// The connection currently backing this record. Disconnect cleanup is
    /// guarded by it, like the dispatcher's conn-id guard: a stale teardown
    /// must not clobber a fast reconnect's marker.
    session: Option<Uuid>,
}

/// Ephemeral "currently viewing chat X" markers.
///
/// Last write wins, only the acting user writes their own record, nothing
/// survives a restart. Failures here are logged and swallowed — presence is
/// best-effort and never fatal to the chat experience.
#[derive(Clone)]
pub struct PresenceTracker {
    inner: Arc<RwLock<HashMap<Uuid, PresenceEntry>>>,
    dispatcher: Dispatcher,
}

impl PresenceTracker {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            dispatcher,
        }
    }

    /// Last-write-wins upsert of the user's active chat marker.
    pub async fn set_active_chat(&self, user_id: Uuid, chat_id: Option<Uuid>) {
        let mut map = self.inner.write().await;
        let entry = map.entry(user_id).or_insert_with(|| PresenceEntry {
            tx: watch::Sender::new(None),
            updated_at: Instant::now(),
            session: None,
        });
        entry.updated_at = Instant::now();
        entry.tx.send_replace(chat_id);
        drop(map);

        self.dispatcher.broadcast(ChangeEvent::PresenceUpdate {
            user_id,
            active_chat_id: chat_id,
        });
    }

    pub async fn get_active_chat(&self, user_id: Uuid) -> Option<Uuid> {
        let map = self.inner.read().await;
        map.get(&user_id).and_then(|e| *e.tx.borrow())
    }

    /// Watch one user's marker. The receiver yields only the new value —
    /// no diffs, no history — and dropping it releases the subscription.
    pub async fn subscribe(&self, user_id: Uuid) -> watch::Receiver<Option<Uuid>> {
        let mut map = self.inner.write().await;
        let entry = map.entry(user_id).or_insert_with(|| PresenceEntry {
            tx: watch::Sender::new(None),
            updated_at: Instant::now(),
            session: None,
        });
        entry.tx.subscribe()
    }

    /// Claim the user's record for a new connection. A reconnect replaces
    /// the previous claim; the old connection's `close_session` becomes a
    /// no-op.
    pub async fn open_session(&self, user_id: Uuid) -> Uuid {
        let session = Uuid::new_v4();
        let mut map = self.inner.write().await;
        let entry = map.entry(user_id).or_insert_with(|| PresenceEntry {
            tx: watch::Sender::new(None),
            updated_at: Instant::now(),
            session: None,
        });
        entry.session = Some(session);
        entry.updated_at = Instant::now();
        session
    }

    /// Disconnect cleanup: clear the marker only if `session` still owns
    /// the record.
    pub async fn close_session(&self, user_id: Uuid, session: Uuid) {
        let was_active = {
            let mut map = self.inner.write().await;
            let Some(entry) = map.get_mut(&user_id) else {
                return;
            };
            if entry.session != Some(session) {
                return;
            }
            entry.session = None;
            entry.updated_at = Instant::now();
            entry.tx.send_replace(None).is_some()
        };

        if was_active {
            self.dispatcher.broadcast(ChangeEvent::PresenceUpdate {
                user_id,
                active_chat_id: None,
            });
        }
    }

    /// Refresh the TTL without touching the value.
    pub async fn heartbeat(&self, user_id: Uuid) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get_mut(&user_id) {
            entry.updated_at = Instant::now();
        }
    }

    /// Expire records with no heartbeat inside the TTL. An uncleanly
    /// dropped client would otherwise leave its "active chat" marker
    /// dangling forever. Watchers of an expired record observe `None`.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut expired = Vec::new();

        {
            let mut map = self.inner.write().await;
            map.retain(|&user_id, entry| {
                if now.duration_since(entry.updated_at) < PRESENCE_TTL {
                    return true;
                }
                let was_active = entry.tx.borrow().is_some();
                if was_active {
                    expired.push(user_id);
                }
                // Keep the entry alive for anyone still watching it
                if entry.tx.receiver_count() > 0 {
                    entry.tx.send_replace(None);
                    entry.updated_at = now;
                    true
                } else {
                    false
                }
            });
        }

        for user_id in expired {
            debug!("Presence expired for {}", user_id);
            self.dispatcher.broadcast(ChangeEvent::PresenceUpdate {
                user_id,
                active_chat_id: None,
            });
        }
    }

    /// Background expiry loop. Runs until the server shuts down.
    pub fn spawn_sweeper(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_INTERVAL);
            tick.tick().await;
            loop {
                tick.tick().await;
                self.sweep().await;
            }
        })
    }
}

/// Sender-side typing throttle, owned by one connection.
///
/// At most one `true` event per chat every TYPING_THROTTLE while the user
/// keeps typing; `false` edges always pass. Consumers clear indicators on
/// their own 3s timer, so a dropped `false` is harmless.
pub struct TypingThrottle {
    last_sent: HashMap<Uuid, Instant>,
}

impl TypingThrottle {
    pub fn new() -> Self {
        Self {
            last_sent: HashMap::new(),
        }
    }

    pub fn should_send(&mut self, chat_id: Uuid, is_typing: bool) -> bool {
        if !is_typing {
            self.last_sent.remove(&chat_id);
            return true;
        }

        let now = Instant::now();
        match self.last_sent.get(&chat_id) {
            Some(&last) if now.duration_since(last) < TYPING_THROTTLE => false,
            _ => {
                self.last_sent.insert(chat_id, now);
                true
            }
        }
    }
}

impl Default for TypingThrottle {
    fn default() -> Self {
        Self::new()
    }
}
