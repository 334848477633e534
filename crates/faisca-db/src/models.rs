/// Database row types — these map directly to SQLite rows.
/// Distinct from faisca-types API models to keep the DB layer independent.

pub struct MatchRow {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub event_id: String,
    pub chat_opened_a: bool,
    pub chat_opened_b: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub seq: i64,
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub status: String,
    pub client_token: Option<String>,
    pub created_at: String,
}

/// One match-list entry with its derived chat summary fields.
pub struct SummaryRow {
    pub match_id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub unread_count: u32,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub ref_id: Option<String>,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}
