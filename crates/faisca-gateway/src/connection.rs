use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use faisca_types::events::{ChangeEvent, GatewayCommand};

use crate::dispatcher::Dispatcher;
use crate::presence::{PresenceTracker, TypingThrottle};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection: Identify handshake, then the
/// event/command loop until either side goes away.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    presence: PresenceTracker,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let user_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} connected to gateway", user_id);

    // Step 2: Send Ready event
    let ready = ChangeEvent::Ready { user_id };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    // Register per-user targeted channel and claim the presence record
    let (conn_id, mut user_rx) = dispatcher.register_user_channel(user_id).await;
    let session = presence.open_session(user_id).await;

    // Subscribe to broadcasts and relay to this client
    let mut broadcast_rx = dispatcher.subscribe();
    let dispatcher_clone = dispatcher.clone();
    let presence_clone = presence.clone();

    // Per-connection chat subscriptions (shared between send and recv tasks).
    let subscribed_chats: Arc<std::sync::RwLock<HashSet<Uuid>>> =
        Arc::new(std::sync::RwLock::new(HashSet::new()));
    let send_subscriptions = subscribed_chats.clone();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward broadcasts + targeted events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    // Don't echo the client's own typing back at it
                    if let ChangeEvent::Typing { user_id: typist, .. } = &event {
                        if *typist == user_id {
                            continue;
                        }
                    }

                    if let Some(chat_id) = event.chat_id() {
                        let subs = send_subscriptions.read()
                            .expect("subscription lock poisoned");
                        if !subs.contains(&chat_id) {
                            continue;
                        }
                    }

                    let text = serde_json::to_string(&event).unwrap();
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                result = user_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };

                    let text = serde_json::to_string(&event).unwrap();
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_subscriptions = subscribed_chats.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut typing_throttle = TypingThrottle::new();

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    match serde_json::from_str::<GatewayCommand>(&text) {
                        Ok(cmd) => {
                            handle_command(
                                &dispatcher_clone,
                                &presence_clone,
                                user_id,
                                cmd,
                                &recv_subscriptions,
                                &mut typing_throttle,
                            )
                            .await;
                        }
                        Err(e) => {
                            warn!(
                                "{} bad command: {} -- raw: {}",
                                user_id,
                                e,
                                truncate_for_log(&text, 200)
                            );
                        }
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                    // A live socket counts as a presence heartbeat too
                    presence_clone.heartbeat(user_id).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish, then tear down the other — every exit
    // path (error included) releases both subscriptions and the timers
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_user_channel(user_id, conn_id).await;
    // Clear the viewing marker unless a newer connection already owns the
    // record — a fast reconnect must not be clobbered by this teardown
    presence.close_session(user_id, session).await;
    info!("{} disconnected from gateway", user_id);
}

/// Cap untrusted frame text for logging without splitting a codepoint.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Uuid> {
    use faisca_types::api::Claims;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let timeout = tokio::time::timeout(std::time::Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(token_data.claims.sub);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

async fn handle_command(
    dispatcher: &Dispatcher,
    presence: &PresenceTracker,
    user_id: Uuid,
    cmd: GatewayCommand,
    subscriptions: &Arc<std::sync::RwLock<HashSet<Uuid>>>,
    typing_throttle: &mut TypingThrottle,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { chat_ids } => {
            info!("{} subscribing to {} chats", user_id, chat_ids.len());
            let mut subs = subscriptions.write()
                .expect("subscription lock poisoned");
            *subs = chat_ids.iter().copied().collect();
        }

        GatewayCommand::SetActiveChat { chat_id } => {
            // Only the acting user ever writes their own record
            presence.set_active_chat(user_id, chat_id).await;
        }

        GatewayCommand::Heartbeat => {
            presence.heartbeat(user_id).await;
        }

        GatewayCommand::Typing { chat_id, is_typing } => {
            if typing_throttle.should_send(chat_id, is_typing) {
                dispatcher.broadcast(ChangeEvent::Typing {
                    chat_id,
                    user_id,
                    is_typing,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_for_log;

    #[test]
    fn log_truncation_respects_char_boundaries() {
        // 100 three-byte chars: byte 200 falls mid-codepoint
        let text = "€".repeat(100);
        let cut = truncate_for_log(&text, 200);
        assert_eq!(cut.len(), 198);
        assert!(text.starts_with(cut));

        assert_eq!(truncate_for_log("curto", 200), "curto");
        assert_eq!(truncate_for_log("ascii só", 7), "ascii s");
    }
}
