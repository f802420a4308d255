//! Database row types — these map directly to SQLite rows.
//! Distinct from feedback-types models to keep the DB layer independent.

pub struct UserRow {
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub session_nonce: String,
}

pub struct FeedbackRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
    pub created_at: String,
}

impl From<UserRow> for feedback_types::models::User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

impl From<FeedbackRow> for feedback_types::models::Feedback {
    fn from(row: FeedbackRow) -> Self {
        let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|e| {
            tracing::warn!("Corrupt created_at '{}' on feedback {}: {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        });
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            username: row.username,
            created_at,
        }
    }
}

/// SQLite stores `datetime('now')` as "YYYY-MM-DD HH:MM:SS" without a zone;
/// those are UTC.
fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, chrono::ParseError> {
    raw.parse::<chrono::DateTime<chrono::Utc>>().or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}
