use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use faisca_db::Database;
use faisca_db::models::MatchRow;
use faisca_gateway::dispatcher::Dispatcher;
use faisca_types::error::{CoreError, CoreResult};
use faisca_types::events::ChangeEvent;
use faisca_types::models::{Candidate, LikeOutcome, NotificationKind};

use crate::notifications::NotificationFeed;
use crate::{blocking, convert, now_ts};

/// Directed like edges and their mutual-match lifecycle:
/// no-edge -> one-sided-like -> matched -> (optionally) unmatched.
#[derive(Clone)]
pub struct MatchRegistry {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    feed: NotificationFeed,
}

enum LikeDbOutcome {
    Already,
    Pending,
    Matched { row: MatchRow, inserted: bool },
}

impl MatchRegistry {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, feed: NotificationFeed) -> Self {
        Self {
            db,
            dispatcher,
            feed,
        }
    }

    /// Record a directed like. If the reverse edge already exists, create
    /// the match — exactly once, even when both sides like concurrently:
    /// the canonical-pair UNIQUE constraint decides, not a check-then-act.
    pub async fn like(&self, from: Uuid, to: Uuid, event_id: Uuid) -> CoreResult<LikeOutcome> {
        if from == to {
            return Err(CoreError::SelfLike);
        }

        let db = self.db.clone();
        let outcome = blocking(move || {
            let created_at = now_ts();
            let inserted = db.insert_like(
                &from.to_string(),
                &to.to_string(),
                &event_id.to_string(),
                &created_at,
            )?;
            if !inserted {
                return Ok(LikeDbOutcome::Already);
            }

            if !db.reverse_like_exists(&from.to_string(), &to.to_string(), &event_id.to_string())? {
                return Ok(LikeDbOutcome::Pending);
            }

            // Canonical pair order: the smaller uuid is user_a on both sides
            let (user_a, user_b) = if from < to { (from, to) } else { (to, from) };
            let (row, inserted) = db.create_match_if_absent(
                &Uuid::new_v4().to_string(),
                &user_a.to_string(),
                &user_b.to_string(),
                &event_id.to_string(),
                &now_ts(),
            )?;
            db.mark_likes_matched(&user_a.to_string(), &user_b.to_string(), &event_id.to_string())?;

            Ok(LikeDbOutcome::Matched { row, inserted })
        })
        .await?;

        match outcome {
            LikeDbOutcome::Already => Err(CoreError::AlreadyLiked),
            LikeDbOutcome::Pending => {
                // The liked user learns someone is interested, not who
                self.feed
                    .push(to, NotificationKind::Like, Some(event_id), "Someone liked you".into())
                    .await?;
                Ok(LikeOutcome::Pending)
            }
            LikeDbOutcome::Matched { row, inserted } => {
                let m = convert::to_match(&row);

                // Under concurrent mutual likes both calls land here, but
                // only the one that created the row announces it — the
                // other would duplicate the events and notifications
                if inserted {
                    info!("Match {} created for event {}", m.id, m.event_id);

                    self.dispatcher
                        .send_to_pair(
                            m.user_a,
                            m.user_b,
                            ChangeEvent::MatchCreate {
                                match_id: m.id,
                                event_id: m.event_id,
                                user_a: m.user_a,
                                user_b: m.user_b,
                                created_at: m.created_at,
                            },
                        )
                        .await;

                    self.feed
                        .push(m.user_a, NotificationKind::Match, Some(m.id), "It's a match!".into())
                        .await?;
                    self.feed
                        .push(m.user_b, NotificationKind::Match, Some(m.id), "It's a match!".into())
                        .await?;
                }

                Ok(LikeOutcome::Matched { match_id: m.id })
            }
        }
    }

    /// Withdraw a one-sided like ("skip" / undo). Mutual edges are
    /// immutable — once matched, only unmatch dissolves the pair.
    /// Idempotent: retracting a non-existent edge is a no-op.
    pub async fn retract_like(&self, from: Uuid, to: Uuid, event_id: Uuid) -> CoreResult<()> {
        let db = self.db.clone();
        blocking(move || {
            db.delete_pending_like(&from.to_string(), &to.to_string(), &event_id.to_string())
        })
        .await?;
        Ok(())
    }

    /// Dissolve a match and its chat. Idempotent: unmatching twice is a
    /// no-op, not an error. Only a member may unmatch.
    pub async fn unmatch(&self, match_id: Uuid, acting_user: Uuid) -> CoreResult<()> {
        let db = self.db.clone();
        let row = blocking(move || db.get_match(&match_id.to_string())).await?;

        let Some(row) = row else {
            return Ok(());
        };
        let m = convert::to_match(&row);
        if !m.has_member(acting_user) {
            return Err(CoreError::NotFound);
        }

        let db = self.db.clone();
        blocking(move || db.delete_match(&match_id.to_string())).await?;

        info!("Match {} dissolved by {}", match_id, acting_user);
        self.dispatcher
            .send_to_pair(m.user_a, m.user_b, ChangeEvent::MatchRemove { match_id })
            .await;

        Ok(())
    }

    /// Mutually-eligible candidates at an event: visible attendees the
    /// caller has not evaluated, excluding the caller.
    pub async fn candidates(&self, event_id: Uuid, caller: Uuid) -> CoreResult<Vec<Candidate>> {
        let db = self.db.clone();
        let ids = blocking(move || db.candidates(&event_id.to_string(), &caller.to_string())).await?;

        Ok(ids
            .iter()
            .map(|id| Candidate {
                user_id: convert::parse_uuid(id, "attendees.user_id"),
                event_id,
            })
            .collect())
    }

    /// Record (or update) the caller's attendance visibility for an event.
    pub async fn set_attendance(&self, user_id: Uuid, event_id: Uuid, visible: bool) -> CoreResult<()> {
        let db = self.db.clone();
        blocking(move || db.upsert_attendee(&user_id.to_string(), &event_id.to_string(), visible))
            .await?;
        Ok(())
    }
}
