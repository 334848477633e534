use crate::Database;
use crate::models::{MatchRow, MessageRow, NotificationRow, SummaryRow};
use anyhow::Result;

impl Database {
    // -- Attendees --

    pub fn upsert_attendee(&self, user_id: &str, event_id: &str, visible: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attendees (user_id, event_id, visible) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, event_id) DO UPDATE SET visible = ?3",
                rusqlite::params![user_id, event_id, visible],
            )?;
            Ok(())
        })
    }

    /// Visible attendees of the event the caller has not evaluated yet
    /// (no outgoing like edge), excluding the caller.
    pub fn candidates(&self, event_id: &str, caller_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.user_id FROM attendees a
                 WHERE a.event_id = ?1
                   AND a.visible = 1
                   AND a.user_id <> ?2
                   AND NOT EXISTS (
                       SELECT 1 FROM likes l
                       WHERE l.from_user = ?2 AND l.to_user = a.user_id AND l.event_id = ?1
                   )
                 ORDER BY a.created_at",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![event_id, caller_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            Ok(rows)
        })
    }

    // -- Likes --

    /// Insert a directed like edge. Returns false if the exact
    /// (from, to, event) edge already exists — the primary key is the guard,
    /// not a check-then-act.
    pub fn insert_like(
        &self,
        from_user: &str,
        to_user: &str,
        event_id: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO likes (from_user, to_user, event_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![from_user, to_user, event_id, created_at],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn reverse_like_exists(&self, from_user: &str, to_user: &str, event_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM likes
                     WHERE from_user = ?1 AND to_user = ?2 AND event_id = ?3
                 )",
                rusqlite::params![to_user, from_user, event_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Once a pair is mutual, both edges become immutable match edges.
    pub fn mark_likes_matched(&self, user_a: &str, user_b: &str, event_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE likes SET is_match = 1
                 WHERE event_id = ?3
                   AND ((from_user = ?1 AND to_user = ?2) OR (from_user = ?2 AND to_user = ?1))",
                rusqlite::params![user_a, user_b, event_id],
            )?;
            Ok(())
        })
    }

    /// Delete a one-sided like ("skip" / undo). Mutual edges are immutable.
    pub fn delete_pending_like(&self, from_user: &str, to_user: &str, event_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM likes
                 WHERE from_user = ?1 AND to_user = ?2 AND event_id = ?3 AND is_match = 0",
                rusqlite::params![from_user, to_user, event_id],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Matches --

    /// Create the match row for a canonical (user_a < user_b) pair, or
    /// return the existing one. `INSERT OR IGNORE` + reselect keeps this
    /// exactly-once under concurrent mutual likes: the UNIQUE constraint
    /// decides the winner, both callers observe the same row. The flag says
    /// whether this call inserted it, so side effects (notifications, match
    /// events) fire once.
    pub fn create_match_if_absent(
        &self,
        id: &str,
        user_a: &str,
        user_b: &str,
        event_id: &str,
        created_at: &str,
    ) -> Result<(MatchRow, bool)> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO matches (id, user_a, user_b, event_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_a, user_b, event_id, created_at],
            )? == 1;

            let row = conn.query_row(
                "SELECT id, user_a, user_b, event_id, chat_opened_a, chat_opened_b, created_at
                 FROM matches WHERE user_a = ?1 AND user_b = ?2 AND event_id = ?3",
                rusqlite::params![user_a, user_b, event_id],
                match_row_mapper,
            )?;

            Ok((row, inserted))
        })
    }

    pub fn get_match(&self, id: &str) -> Result<Option<MatchRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_a, user_b, event_id, chat_opened_a, chat_opened_b, created_at
                 FROM matches WHERE id = ?1",
                [id],
                match_row_mapper,
            )
            .optional()
        })
    }

    /// Remove a match and (via FK cascade) its message log.
    /// Returns false when the row was already gone — unmatch is idempotent.
    pub fn delete_match(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM matches WHERE id = ?1", [id])?;
            Ok(changed == 1)
        })
    }

    /// Flip the first-open flag for whichever side `user_id` is on.
    pub fn mark_chat_opened(&self, match_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE matches SET
                     chat_opened_a = CASE WHEN user_a = ?2 THEN 1 ELSE chat_opened_a END,
                     chat_opened_b = CASE WHEN user_b = ?2 THEN 1 ELSE chat_opened_b END
                 WHERE id = ?1",
                rusqlite::params![match_id, user_id],
            )?;
            Ok(())
        })
    }

    // -- Chat summaries --

    /// All matches for a user with derived last-message and unread fields.
    /// Ordering is applied by the caller (last activity desc).
    pub fn chat_summaries(&self, user_id: &str) -> Result<Vec<SummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(SUMMARY_SQL)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id], summary_row_mapper)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Scoped refetch of a single summary, for reconciling bulk read-state
    /// changes without reloading the whole list.
    pub fn chat_summary(&self, user_id: &str, match_id: &str) -> Result<Option<SummaryRow>> {
        self.with_conn(|conn| {
            let sql = format!("{SUMMARY_SQL} AND m.id = ?2");
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row(rusqlite::params![user_id, match_id], summary_row_mapper)
                .optional()
        })
    }

    // -- Messages --

    /// Append a message. Returns the assigned insertion sequence.
    pub fn insert_message(
        &self,
        id: &str,
        chat_id: &str,
        sender_id: &str,
        content: &str,
        client_token: &str,
        created_at: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender_id, content, client_token, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, chat_id, sender_id, content, client_token, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Full history for one chat, ascending by (created_at, seq).
    pub fn get_messages(&self, chat_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, id, chat_id, sender_id, content, status, client_token, created_at
                 FROM messages
                 WHERE chat_id = ?1
                 ORDER BY created_at ASC, seq ASC",
            )?;

            let rows = stmt
                .query_map([chat_id], message_row_mapper)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Bulk sent|delivered -> seen on messages the reader did not author.
    /// Commutative and idempotent; repeated application converges.
    /// Returns the number of rows that actually flipped.
    pub fn mark_read(&self, chat_id: &str, reader_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = 'seen'
                 WHERE chat_id = ?1 AND sender_id <> ?2 AND status <> 'seen'",
                rusqlite::params![chat_id, reader_id],
            )?;
            Ok(changed)
        })
    }

    /// Bulk sent -> delivered for the recipient. The WHERE clause keeps the
    /// transition forward-only: seen rows are never touched.
    pub fn mark_delivered(&self, chat_id: &str, recipient_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = 'delivered'
                 WHERE chat_id = ?1 AND sender_id <> ?2 AND status = 'sent'",
                rusqlite::params![chat_id, recipient_id],
            )?;
            Ok(changed)
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        kind: &str,
        ref_id: Option<&str>,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, ref_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, kind, ref_id, body, created_at],
            )?;
            Ok(())
        })
    }

    /// One merged feed across kinds, newest first.
    pub fn notifications_for_user(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, ref_id, body, read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        ref_id: row.get(3)?,
                        body: row.get(4)?,
                        read: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Idempotent: re-marking a read notification changes nothing.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user_id],
            )?;
            Ok(())
        })
    }
}

/// Shared base for the list and single-summary queries. The subselects keep
/// unread_count authoritative: partner-authored rows with status != seen.
const SUMMARY_SQL: &str = "
    SELECT m.id, m.user_a, m.user_b, m.created_at,
        (SELECT content FROM messages
         WHERE chat_id = m.id ORDER BY created_at DESC, seq DESC LIMIT 1),
        (SELECT created_at FROM messages
         WHERE chat_id = m.id ORDER BY created_at DESC, seq DESC LIMIT 1),
        (SELECT COUNT(*) FROM messages
         WHERE chat_id = m.id AND sender_id <> ?1 AND status <> 'seen')
    FROM matches m
    WHERE (m.user_a = ?1 OR m.user_b = ?1)";

fn match_row_mapper(row: &rusqlite::Row<'_>) -> std::result::Result<MatchRow, rusqlite::Error> {
    Ok(MatchRow {
        id: row.get(0)?,
        user_a: row.get(1)?,
        user_b: row.get(2)?,
        event_id: row.get(3)?,
        chat_opened_a: row.get(4)?,
        chat_opened_b: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn summary_row_mapper(row: &rusqlite::Row<'_>) -> std::result::Result<SummaryRow, rusqlite::Error> {
    Ok(SummaryRow {
        match_id: row.get(0)?,
        user_a: row.get(1)?,
        user_b: row.get(2)?,
        created_at: row.get(3)?,
        last_message: row.get(4)?,
        last_message_at: row.get(5)?,
        unread_count: row.get(6)?,
    })
}

fn message_row_mapper(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        seq: row.get(0)?,
        id: row.get(1)?,
        chat_id: row.get(2)?,
        sender_id: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        client_token: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
