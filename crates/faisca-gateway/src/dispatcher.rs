use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use faisca_types::events::ChangeEvent;

/// Fans row-level change events out to connected clients.
///
/// Two paths: a broadcast channel for chat-scoped and global events (each
/// connection filters by its subscribed chats), and per-user mpsc channels
/// for targeted events (match created/removed, notifications). Dropping a
/// broadcast receiver releases the subscription — there are no global
/// handles to clean up.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for change events — every connection receives and
    /// filters by its chat subscriptions
    broadcast_tx: broadcast::Sender<ChangeEvent>,

    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<ChangeEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to change events. Returns a broadcast receiver; dropping it
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients. Delivery is
    /// at-least-once at best: lagging receivers may observe replays after a
    /// refetch, so consumers dedup by row identity.
    pub fn broadcast(&self, event: ChangeEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    /// A reconnect replaces the previous registration; the old connection's
    /// cleanup becomes a no-op thanks to the conn_id guard.
    pub async fn register_user_channel(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<ChangeEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Silently dropped when the
    /// user has no live connection — targeted events all have durable rows
    /// behind them, so a refetch on reconnect recovers the state.
    pub async fn send_to_user(&self, user_id: Uuid, event: ChangeEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }

    /// Send a targeted event to both members of a match.
    pub async fn send_to_pair(&self, user_a: Uuid, user_b: Uuid, event: ChangeEvent) {
        self.send_to_user(user_a, event.clone()).await;
        self.send_to_user(user_b, event).await;
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
