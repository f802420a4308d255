use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, feedback)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                username    TEXT PRIMARY KEY CHECK (length(username) <= 20),
                password    TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE CHECK (length(email) <= 50),
                first_name  TEXT NOT NULL CHECK (length(first_name) <= 30),
                last_name   TEXT NOT NULL CHECK (length(last_name) <= 30),
                -- Random per account; session tokens carry it, so tokens
                -- issued to a deleted account never match a re-registration.
                session_nonce TEXT NOT NULL
            );

            CREATE TABLE feedback (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL CHECK (length(title) <= 100),
                content     TEXT NOT NULL,
                username    TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_feedback_username
                ON feedback(username, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
