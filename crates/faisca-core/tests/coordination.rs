//! Integration tests for the match/chat coordination core against an
//! in-memory store and a live dispatcher.

use std::sync::Arc;

use uuid::Uuid;

use faisca_core::channels::ChatChannelManager;
use faisca_core::notifications::NotificationFeed;
use faisca_core::registry::MatchRegistry;
use faisca_core::store::MessageStore;
use faisca_db::Database;
use faisca_gateway::dispatcher::Dispatcher;
use faisca_types::error::CoreError;
use faisca_types::events::ChangeEvent;
use faisca_types::models::{LikeOutcome, MessageStatus, NotificationKind};

struct Harness {
    registry: MatchRegistry,
    store: MessageStore,
    channels: ChatChannelManager,
    feed: NotificationFeed,
    dispatcher: Dispatcher,
}

fn harness() -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let dispatcher = Dispatcher::new();
    let feed = NotificationFeed::new(db.clone(), dispatcher.clone());
    let store = MessageStore::new(db.clone(), dispatcher.clone());
    Harness {
        registry: MatchRegistry::new(db.clone(), dispatcher.clone(), feed.clone()),
        channels: ChatChannelManager::new(db, store.clone()),
        store,
        feed,
        dispatcher,
    }
}

async fn matched_pair(h: &Harness) -> (Uuid, Uuid, Uuid) {
    let (a, b, event) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    assert_eq!(h.registry.like(a, b, event).await.unwrap(), LikeOutcome::Pending);
    let LikeOutcome::Matched { match_id } = h.registry.like(b, a, event).await.unwrap() else {
        panic!("second like must complete the match");
    };
    (a, b, match_id)
}

#[tokio::test]
async fn mutual_likes_create_exactly_one_match() {
    let h = harness();
    let (a, b, event) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    assert_eq!(h.registry.like(a, b, event).await.unwrap(), LikeOutcome::Pending);
    let LikeOutcome::Matched { match_id } = h.registry.like(b, a, event).await.unwrap() else {
        panic!("expected a match");
    };

    // Exactly one match visible from both sides, same id
    let a_list = h.channels.list_matches(a).await.unwrap();
    let b_list = h.channels.list_matches(b).await.unwrap();
    assert_eq!(a_list.len(), 1);
    assert_eq!(b_list.len(), 1);
    assert_eq!(a_list[0].match_id, match_id);
    assert_eq!(b_list[0].match_id, match_id);
    assert_eq!(a_list[0].partner_id, b);
    assert_eq!(b_list[0].partner_id, a);
}

#[tokio::test]
async fn concurrent_mutual_likes_yield_one_match() {
    let h = harness();
    let (a, b, event) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let r1 = h.registry.clone();
    let r2 = h.registry.clone();
    let (o1, o2) = tokio::join!(
        tokio::spawn(async move { r1.like(a, b, event).await }),
        tokio::spawn(async move { r2.like(b, a, event).await }),
    );
    let (o1, o2) = (o1.unwrap().unwrap(), o2.unwrap().unwrap());

    // Whichever interleaving won, the pair converged on a single match row
    let list = h.channels.list_matches(a).await.unwrap();
    assert_eq!(list.len(), 1);

    let matched_ids: Vec<Uuid> = [o1, o2]
        .iter()
        .filter_map(|o| match o {
            LikeOutcome::Matched { match_id } => Some(*match_id),
            LikeOutcome::Pending => None,
        })
        .collect();
    assert!(!matched_ids.is_empty(), "at least one side must observe the match");
    for id in matched_ids {
        assert_eq!(id, list[0].match_id);
    }

    // Even when both calls take the matched branch, only the inserting one
    // announces: exactly one match notification per user
    for user in [a, b] {
        let feed = h.feed.list(user).await.unwrap();
        let match_notes = feed.iter().filter(|n| n.kind == NotificationKind::Match).count();
        assert_eq!(match_notes, 1);
    }
}

#[tokio::test]
async fn duplicate_like_is_rejected_without_new_row() {
    let h = harness();
    let (a, b, event) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    h.registry.like(a, b, event).await.unwrap();
    let err = h.registry.like(a, b, event).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyLiked));

    // Still only one like notification on the receiving side
    let feed = h.feed.list(b).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, NotificationKind::Like);
}

#[tokio::test]
async fn self_like_is_rejected() {
    let h = harness();
    let user = Uuid::new_v4();
    let err = h.registry.like(user, user, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::SelfLike));
}

#[tokio::test]
async fn send_appends_in_order() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;

    h.store.send(chat, a, "primeiro".into(), "t1".into()).await.unwrap();
    h.store.send(chat, b, "segundo".into(), "t2".into()).await.unwrap();
    h.store.send(chat, a, "oi".into(), "t3".into()).await.unwrap();

    let messages = h.channels.get_messages(chat, a).await.unwrap();
    assert_eq!(messages.len(), 3);
    let last = messages.last().unwrap();
    assert_eq!(last.content, "oi");
    assert_eq!(last.client_token.as_deref(), Some("t3"));
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
        assert!(pair[0].seq < pair[1].seq);
    }
}

#[tokio::test]
async fn send_to_unknown_chat_is_not_found() {
    let h = harness();
    let err = h
        .store
        .send(Uuid::new_v4(), Uuid::new_v4(), "oi".into(), "t1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[tokio::test]
async fn mark_read_spares_own_messages() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;

    h.store.send(chat, a, "de a".into(), "t1".into()).await.unwrap();
    h.store.send(chat, b, "de b".into(), "t2".into()).await.unwrap();

    h.store.mark_read(chat, b).await.unwrap();

    let messages = h.channels.get_messages(chat, b).await.unwrap();
    for msg in &messages {
        if msg.sender_id == a {
            assert_eq!(msg.status, MessageStatus::Seen);
        } else {
            // The reader's own messages are untouched
            assert_eq!(msg.status, MessageStatus::Sent);
        }
    }
}

#[tokio::test]
async fn delivered_never_regresses_seen() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;

    h.store.send(chat, a, "um".into(), "t1".into()).await.unwrap();
    h.store.mark_read(chat, b).await.unwrap();
    h.store.mark_delivered(chat, b).await.unwrap();

    let messages = h.channels.get_messages(chat, b).await.unwrap();
    assert_eq!(messages[0].status, MessageStatus::Seen);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;
    h.store.send(chat, a, "oi".into(), "t1".into()).await.unwrap();

    h.store.mark_read(chat, b).await.unwrap();
    h.store.mark_read(chat, b).await.unwrap();

    let summary = h.channels.summary(b, chat).await.unwrap();
    assert_eq!(summary.unread_count, 0);
}

#[tokio::test]
async fn unread_count_end_to_end() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;

    // A sends "oi"; B is not viewing the chat
    let sent = h.store.send(chat, a, "oi".into(), "t1".into()).await.unwrap();

    let list = h.channels.list_matches(b).await.unwrap();
    assert_eq!(list[0].last_message.as_deref(), Some("oi"));
    assert_eq!(list[0].last_message_at, Some(sent.created_at));
    assert_eq!(list[0].unread_count, 1);

    // B opens the chat
    h.channels.open_chat(chat, b).await.unwrap();

    let list = h.channels.list_matches(b).await.unwrap();
    assert_eq!(list[0].unread_count, 0);

    let messages = h.channels.get_messages(chat, b).await.unwrap();
    assert_eq!(messages[0].status, MessageStatus::Seen);

    // The sender's own view counts nothing as unread
    let list = h.channels.list_matches(a).await.unwrap();
    assert_eq!(list[0].unread_count, 0);
}

#[tokio::test]
async fn list_matches_orders_by_activity() {
    let h = harness();
    let viewer = Uuid::new_v4();
    let event = Uuid::new_v4();

    let first_partner = Uuid::new_v4();
    h.registry.like(viewer, first_partner, event).await.unwrap();
    let LikeOutcome::Matched { match_id: first } =
        h.registry.like(first_partner, viewer, event).await.unwrap()
    else {
        panic!("expected match");
    };

    let second_partner = Uuid::new_v4();
    h.registry.like(viewer, second_partner, event).await.unwrap();
    let LikeOutcome::Matched { match_id: second } =
        h.registry.like(second_partner, viewer, event).await.unwrap()
    else {
        panic!("expected match");
    };

    // No messages anywhere: newest match first
    let list = h.channels.list_matches(viewer).await.unwrap();
    assert_eq!(list[0].match_id, second);

    // A message in the older chat moves it to the top
    h.store.send(first, first_partner, "oi".into(), "t1".into()).await.unwrap();
    let list = h.channels.list_matches(viewer).await.unwrap();
    assert_eq!(list[0].match_id, first);
    assert_eq!(list[1].match_id, second);
}

#[tokio::test]
async fn unmatch_is_idempotent_and_cascades() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;
    h.store.send(chat, a, "oi".into(), "t1".into()).await.unwrap();

    h.registry.unmatch(chat, a).await.unwrap();
    // Second unmatch is a no-op, not an error
    h.registry.unmatch(chat, a).await.unwrap();

    assert!(h.channels.list_matches(a).await.unwrap().is_empty());
    assert!(h.channels.list_matches(b).await.unwrap().is_empty());

    // The chat is gone with the match
    let err = h.channels.get_messages(chat, a).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[tokio::test]
async fn unmatch_by_outsider_is_rejected() {
    let h = harness();
    let (_, _, chat) = matched_pair(&h).await;

    let err = h.registry.unmatch(chat, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound));
}

#[tokio::test]
async fn candidates_exclude_self_invisible_and_evaluated() {
    let h = harness();
    let event = Uuid::new_v4();
    let caller = Uuid::new_v4();
    let fresh = Uuid::new_v4();
    let hidden = Uuid::new_v4();
    let liked = Uuid::new_v4();

    for (user, visible) in [(caller, true), (fresh, true), (hidden, false), (liked, true)] {
        h.registry.set_attendance(user, event, visible).await.unwrap();
    }
    h.registry.like(caller, liked, event).await.unwrap();

    let candidates = h.registry.candidates(event, caller).await.unwrap();
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.user_id).collect();
    assert_eq!(ids, vec![fresh]);
}

#[tokio::test]
async fn retracted_like_reappears_as_candidate() {
    let h = harness();
    let event = Uuid::new_v4();
    let (caller, other) = (Uuid::new_v4(), Uuid::new_v4());

    h.registry.set_attendance(caller, event, true).await.unwrap();
    h.registry.set_attendance(other, event, true).await.unwrap();

    h.registry.like(caller, other, event).await.unwrap();
    assert!(h.registry.candidates(event, caller).await.unwrap().is_empty());

    h.registry.retract_like(caller, other, event).await.unwrap();
    assert_eq!(h.registry.candidates(event, caller).await.unwrap().len(), 1);
}

#[tokio::test]
async fn match_notifies_both_sides() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;

    for user in [a, b] {
        let feed = h.feed.list(user).await.unwrap();
        let match_note = feed
            .iter()
            .find(|n| n.kind == NotificationKind::Match)
            .expect("match notification missing");
        assert_eq!(match_note.ref_id, Some(chat));
    }
}

#[tokio::test]
async fn notification_read_markers_are_idempotent() {
    let h = harness();
    let (_, b, _) = matched_pair(&h).await;

    let feed = h.feed.list(b).await.unwrap();
    let id = feed[0].id;

    h.feed.mark_read(id, b).await.unwrap();
    h.feed.mark_read(id, b).await.unwrap();
    h.feed.mark_all_read(b).await.unwrap();
    h.feed.mark_all_read(b).await.unwrap();

    assert!(h.feed.list(b).await.unwrap().iter().all(|n| n.read));
}

#[tokio::test]
async fn send_broadcasts_chat_scoped_insert() {
    let h = harness();
    let (a, _, chat) = matched_pair(&h).await;

    let mut rx = h.dispatcher.subscribe();
    let sent = h.store.send(chat, a, "oi".into(), "t1".into()).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.chat_id(), Some(chat));
    let ChangeEvent::MessageInsert { message } = event else {
        panic!("expected MessageInsert, got {event:?}");
    };
    assert_eq!(message.id, sent.id);
    assert_eq!(message.client_token.as_deref(), Some("t1"));
}

#[tokio::test]
async fn mark_read_broadcasts_bulk_marker_once() {
    let h = harness();
    let (a, b, chat) = matched_pair(&h).await;
    h.store.send(chat, a, "oi".into(), "t1".into()).await.unwrap();

    let mut rx = h.dispatcher.subscribe();
    h.store.mark_read(chat, b).await.unwrap();
    // Replay flips nothing and must stay silent
    h.store.mark_read(chat, b).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert!(matches!(
        event,
        ChangeEvent::MessageStatusBulk { chat_id, actor_id, status: MessageStatus::Seen }
            if chat_id == chat && actor_id == b
    ));
    assert!(rx.try_recv().is_err(), "idempotent replay must not re-announce");
}

#[tokio::test]
async fn match_create_is_targeted_to_both_members() {
    let h = harness();
    let (a, b, event) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let (_, mut rx_a) = h.dispatcher.register_user_channel(a).await;
    let (_, mut rx_b) = h.dispatcher.register_user_channel(b).await;

    h.registry.like(a, b, event).await.unwrap();
    let LikeOutcome::Matched { match_id } = h.registry.like(b, a, event).await.unwrap() else {
        panic!("expected match");
    };

    for rx in [&mut rx_a, &mut rx_b] {
        loop {
            match rx.recv().await.unwrap() {
                ChangeEvent::MatchCreate { match_id: id, .. } => {
                    assert_eq!(id, match_id);
                    break;
                }
                // Like/match notifications share the targeted channel
                ChangeEvent::NotificationCreate { .. } => continue,
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
