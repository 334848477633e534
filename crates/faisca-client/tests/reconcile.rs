//! Reconciliation-layer tests: optimistic sends against acks and the
//! at-least-once change stream.

use chrono::{Duration, Utc};
use uuid::Uuid;

use faisca_client::chat::ChatState;
use faisca_client::matches::MatchListState;
use faisca_client::typing::TypingWatcher;
use faisca_types::events::ChangeEvent;
use faisca_types::models::{ChatSummary, Message, MessageStatus};

fn message(chat_id: Uuid, sender_id: Uuid, content: &str, seq: i64, token: Option<&str>) -> Message {
    Message {
        id: Uuid::new_v4(),
        chat_id,
        sender_id,
        content: content.to_string(),
        created_at: Utc::now() + Duration::milliseconds(seq),
        seq,
        status: MessageStatus::Sent,
        client_token: token.map(str::to_string),
    }
}

fn summary(match_id: Uuid, partner_id: Uuid) -> ChatSummary {
    ChatSummary {
        match_id,
        partner_id,
        created_at: Utc::now(),
        last_message: None,
        last_message_at: None,
        unread_count: 0,
    }
}

// -- ChatState --

#[test]
fn ack_then_echo_yields_one_message() {
    let (chat, me) = (Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![]);

    state.push_pending("tok-1", "oi");
    assert_eq!(state.pending().len(), 1);

    let stored = message(chat, me, "oi", 1, Some("tok-1"));
    state.confirm("tok-1", stored.clone());
    assert!(state.pending().is_empty());
    assert_eq!(state.messages().len(), 1);

    // The realtime echo of the same row is a replay, not a second message
    state.apply(&ChangeEvent::MessageInsert { message: stored });
    assert_eq!(state.messages().len(), 1);
}

#[test]
fn echo_before_ack_resolves_by_token() {
    let (chat, me) = (Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![]);

    state.push_pending("tok-1", "oi");

    // The realtime echo can outrun the HTTP ack; the token decides, never
    // array position or timing
    let stored = message(chat, me, "oi", 1, Some("tok-1"));
    state.apply(&ChangeEvent::MessageInsert { message: stored.clone() });
    assert!(state.pending().is_empty());
    assert_eq!(state.messages().len(), 1);

    state.confirm("tok-1", stored);
    assert_eq!(state.messages().len(), 1);
}

#[test]
fn rollback_preserves_draft_content() {
    let mut state = ChatState::new(Uuid::new_v4(), Uuid::new_v4(), vec![]);
    state.push_pending("tok-1", "mensagem importante");

    let draft = state.rollback("tok-1");
    assert_eq!(draft.as_deref(), Some("mensagem importante"));
    assert!(state.pending().is_empty());
    assert!(state.rollback("tok-1").is_none());
}

#[test]
fn duplicate_outstanding_token_is_ignored() {
    let mut state = ChatState::new(Uuid::new_v4(), Uuid::new_v4(), vec![]);
    state.push_pending("tok-1", "primeiro");
    state.push_pending("tok-1", "segundo");
    assert_eq!(state.pending().len(), 1);
    assert_eq!(state.pending()[0].content, "primeiro");
}

#[test]
fn partner_token_collision_leaves_pending_untouched() {
    let (chat, me, partner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![]);

    state.push_pending("tok-1", "minha");

    // A partner row carrying the same token string is their send, not the
    // resolution of ours
    state.apply(&ChangeEvent::MessageInsert {
        message: message(chat, partner, "oi", 1, Some("tok-1")),
    });
    assert_eq!(state.pending().len(), 1);
    assert_eq!(state.messages().len(), 1);
}

#[test]
fn inserts_keep_total_order() {
    let (chat, me, partner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![]);

    let first = message(chat, partner, "um", 1, None);
    let second = message(chat, partner, "dois", 2, None);

    // Out-of-order arrival still lands in (created_at, seq) order
    state.apply(&ChangeEvent::MessageInsert { message: second.clone() });
    state.apply(&ChangeEvent::MessageInsert { message: first.clone() });

    let contents: Vec<&str> = state.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["um", "dois"]);
}

#[test]
fn status_bulk_is_forward_only() {
    let (chat, me, partner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mine = message(chat, me, "minha", 1, None);
    let theirs = message(chat, partner, "deles", 2, None);
    let mut state = ChatState::new(chat, me, vec![mine, theirs]);

    // Partner saw my messages
    state.apply(&ChangeEvent::MessageStatusBulk {
        chat_id: chat,
        actor_id: partner,
        status: MessageStatus::Seen,
    });
    assert_eq!(state.messages()[0].status, MessageStatus::Seen);
    // Partner-authored rows are not the partner's to flip
    assert_eq!(state.messages()[1].status, MessageStatus::Sent);

    // A late/replayed delivered marker must not regress seen
    state.apply(&ChangeEvent::MessageStatusBulk {
        chat_id: chat,
        actor_id: partner,
        status: MessageStatus::Delivered,
    });
    assert_eq!(state.messages()[0].status, MessageStatus::Seen);
}

#[test]
fn other_chats_are_ignored() {
    let (chat, me) = (Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![]);

    state.apply(&ChangeEvent::MessageInsert {
        message: message(Uuid::new_v4(), me, "alheia", 1, None),
    });
    assert!(state.messages().is_empty());
}

#[test]
fn match_remove_drops_local_state() {
    let (chat, me, partner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![message(chat, partner, "oi", 1, None)]);

    state.apply(&ChangeEvent::MatchRemove { match_id: chat });
    assert!(state.is_closed());
    assert!(state.messages().is_empty());

    // Late events for the dead chat are dropped
    state.apply(&ChangeEvent::MessageInsert {
        message: message(chat, partner, "tarde demais", 2, None),
    });
    assert!(state.messages().is_empty());
}

#[test]
fn stale_view_asks_for_refetch_and_reset_clears_it() {
    let (chat, me, partner) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mut state = ChatState::new(chat, me, vec![]);

    state.mark_stale();
    assert!(state.needs_refetch());

    state.push_pending("tok-1", "oi");
    state.reset(vec![message(chat, partner, "hist", 1, None)]);
    assert!(!state.needs_refetch());
    assert_eq!(state.messages().len(), 1);
    // Pending sends survive a refetch; they reconcile against later events
    assert_eq!(state.pending().len(), 1);
}

// -- MatchListState --

#[test]
fn insert_moves_chat_to_top_and_counts_unread() {
    let viewer = Uuid::new_v4();
    let (chat_a, chat_b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut list = MatchListState::new(
        viewer,
        vec![summary(chat_a, Uuid::new_v4()), summary(chat_b, Uuid::new_v4())],
    );

    let partner_msg = message(chat_b, Uuid::new_v4(), "oi", 1, None);
    list.apply(&ChangeEvent::MessageInsert { message: partner_msg.clone() });

    assert_eq!(list.entries()[0].match_id, chat_b);
    assert_eq!(list.entries()[0].last_message.as_deref(), Some("oi"));
    assert_eq!(list.entries()[0].unread_count, 1);

    // Replay of the same insert must not double-count
    list.apply(&ChangeEvent::MessageInsert { message: partner_msg });
    assert_eq!(list.entries()[0].unread_count, 1);
}

#[test]
fn own_and_active_chat_messages_do_not_count_unread() {
    let viewer = Uuid::new_v4();
    let chat = Uuid::new_v4();
    let partner = Uuid::new_v4();
    let mut list = MatchListState::new(viewer, vec![summary(chat, partner)]);

    // Own message: summary updates, unread does not
    list.apply(&ChangeEvent::MessageInsert { message: message(chat, viewer, "minha", 1, None) });
    assert_eq!(list.entries()[0].unread_count, 0);

    // Viewing the chat: partner messages arrive already-read
    list.open_chat(chat);
    list.apply(&ChangeEvent::MessageInsert { message: message(chat, partner, "oi", 2, None) });
    assert_eq!(list.entries()[0].unread_count, 0);

    // Closed again: the counter resumes
    list.close_chat();
    list.apply(&ChangeEvent::MessageInsert { message: message(chat, partner, "e ai", 3, None) });
    assert_eq!(list.entries()[0].unread_count, 1);
}

#[test]
fn open_chat_clears_unread_optimistically() {
    let viewer = Uuid::new_v4();
    let chat = Uuid::new_v4();
    let partner = Uuid::new_v4();
    let mut list = MatchListState::new(viewer, vec![summary(chat, partner)]);

    list.apply(&ChangeEvent::MessageInsert { message: message(chat, partner, "oi", 1, None) });
    assert_eq!(list.entries()[0].unread_count, 1);

    // Cleared before any authoritative confirmation arrives
    list.open_chat(chat);
    assert_eq!(list.entries()[0].unread_count, 0);
}

#[test]
fn viewer_read_all_zeroes_and_bulk_updates_flag_stale() {
    let viewer = Uuid::new_v4();
    let chat = Uuid::new_v4();
    let partner = Uuid::new_v4();
    let mut list = MatchListState::new(viewer, vec![summary(chat, partner)]);
    list.apply(&ChangeEvent::MessageInsert { message: message(chat, partner, "oi", 1, None) });

    list.apply(&ChangeEvent::MessageStatusBulk {
        chat_id: chat,
        actor_id: viewer,
        status: MessageStatus::Seen,
    });
    assert_eq!(list.entries()[0].unread_count, 0);

    // Bulk changes invalidate the summary for a scoped refetch
    let stale = list.take_stale();
    assert_eq!(stale, vec![chat]);
    assert!(list.take_stale().is_empty());

    let mut refetched = summary(chat, partner);
    refetched.last_message = Some("oi".into());
    list.apply_refetched(refetched);
    assert_eq!(list.entries()[0].last_message.as_deref(), Some("oi"));
}

#[test]
fn unknown_chat_insert_requests_full_refetch() {
    let viewer = Uuid::new_v4();
    let mut list = MatchListState::new(viewer, vec![]);

    list.apply(&ChangeEvent::MessageInsert {
        message: message(Uuid::new_v4(), Uuid::new_v4(), "oi", 1, None),
    });
    assert!(list.needs_full_refetch());

    list.reset(vec![]);
    assert!(!list.needs_full_refetch());
}

#[test]
fn match_create_and_remove_maintain_the_list() {
    let viewer = Uuid::new_v4();
    let partner = Uuid::new_v4();
    let match_id = Uuid::new_v4();
    let mut list = MatchListState::new(viewer, vec![]);

    let create = ChangeEvent::MatchCreate {
        match_id,
        event_id: Uuid::new_v4(),
        user_a: partner,
        user_b: viewer,
        created_at: Utc::now(),
    };
    list.apply(&create);
    // At-least-once delivery: the replay changes nothing
    list.apply(&create);
    assert_eq!(list.entries().len(), 1);
    assert_eq!(list.entries()[0].partner_id, partner);

    list.open_chat(match_id);
    list.apply(&ChangeEvent::MatchRemove { match_id });
    assert!(list.entries().is_empty());
    assert_eq!(list.active_chat(), None);
}

// -- TypingWatcher --

#[tokio::test(start_paused = true)]
async fn typing_indicator_auto_clears_after_three_seconds() {
    let chat = Uuid::new_v4();
    let typist = Uuid::new_v4();
    let mut watcher = TypingWatcher::new(chat);

    watcher.apply(&ChangeEvent::Typing { chat_id: chat, user_id: typist, is_typing: true });
    assert_eq!(watcher.typing_users(), vec![typist]);

    // No follow-up: the indicator clears on the timer, tolerating a lost
    // "stopped typing" event
    tokio::time::advance(std::time::Duration::from_millis(3100)).await;
    assert!(watcher.typing_users().is_empty());
}

#[tokio::test(start_paused = true)]
async fn continued_typing_extends_the_deadline() {
    let chat = Uuid::new_v4();
    let typist = Uuid::new_v4();
    let mut watcher = TypingWatcher::new(chat);

    watcher.apply(&ChangeEvent::Typing { chat_id: chat, user_id: typist, is_typing: true });
    tokio::time::advance(std::time::Duration::from_secs(2)).await;

    watcher.apply(&ChangeEvent::Typing { chat_id: chat, user_id: typist, is_typing: true });
    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    assert_eq!(watcher.typing_users(), vec![typist]);

    tokio::time::advance(std::time::Duration::from_millis(1100)).await;
    assert!(watcher.typing_users().is_empty());
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_clears_immediately() {
    let chat = Uuid::new_v4();
    let typist = Uuid::new_v4();
    let mut watcher = TypingWatcher::new(chat);

    watcher.apply(&ChangeEvent::Typing { chat_id: chat, user_id: typist, is_typing: true });
    watcher.apply(&ChangeEvent::Typing { chat_id: chat, user_id: typist, is_typing: false });
    assert!(watcher.typing_users().is_empty());
}
