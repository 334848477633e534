use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Who is at an event and whether they opted into the match layer
        CREATE TABLE IF NOT EXISTS attendees (
            user_id     TEXT NOT NULL,
            event_id    TEXT NOT NULL,
            visible     INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, event_id)
        );

        -- Directed like edges. The primary key is the duplicate-like guard.
        CREATE TABLE IF NOT EXISTS likes (
            from_user   TEXT NOT NULL,
            to_user     TEXT NOT NULL,
            event_id    TEXT NOT NULL,
            is_match    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (from_user, to_user, event_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_reverse
            ON likes(to_user, from_user, event_id);

        -- user_a < user_b (canonical order). The UNIQUE constraint is the
        -- exactly-once guard for concurrent mutual likes: both sides may
        -- attempt the insert, only one row ever exists.
        CREATE TABLE IF NOT EXISTS matches (
            id              TEXT PRIMARY KEY,
            user_a          TEXT NOT NULL,
            user_b          TEXT NOT NULL,
            event_id        TEXT NOT NULL,
            chat_opened_a   INTEGER NOT NULL DEFAULT 0,
            chat_opened_b   INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (user_a, user_b, event_id)
        );

        -- Append-only message log. seq breaks created_at ties; a match's
        -- chat shares the match id, and unmatch cascades the log away.
        CREATE TABLE IF NOT EXISTS messages (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            chat_id         TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            sender_id       TEXT NOT NULL,
            content         TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'sent',
            client_token    TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at, seq);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            kind        TEXT NOT NULL,
            ref_id      TEXT,
            body        TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
