use crate::models::{FeedbackRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "username, password, email, first_name, last_name, session_nonce";
const FEEDBACK_COLUMNS: &str = "id, title, content, username, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        session_nonce: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, email, first_name, last_name, session_nonce)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (username, password_hash, email, first_name, last_name, session_nonce),
            )?;
            Ok(())
        })
    }

    /// The nonce session tokens for `username` must carry; `None` once the
    /// account is gone.
    pub fn get_session_nonce(&self, username: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT session_nonce FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Deletes the user; their feedback goes with them via ON DELETE CASCADE.
    /// Returns false if no such user existed.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE username = ?1", [username])?;
            Ok(n > 0)
        })
    }

    // -- Feedback --

    /// Returns the new row id.
    pub fn insert_feedback(&self, username: &str, title: &str, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (title, content, username) VALUES (?1, ?2, ?3)",
                (title, content, username),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_feedback(&self, id: i64) -> Result<Option<FeedbackRow>> {
        self.with_conn(|conn| query_feedback(conn, id))
    }

    /// Newest first.
    pub fn get_feedback_for_user(&self, username: &str) -> Result<Vec<FeedbackRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE username = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([username], feedback_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrites title and content. `None` if the id does not exist.
    pub fn update_feedback(&self, id: i64, title: &str, content: &str) -> Result<Option<FeedbackRow>> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE feedback SET title = ?1, content = ?2 WHERE id = ?3",
                rusqlite::params![title, content, id],
            )?;
            if n == 0 {
                return Ok(None);
            }
            query_feedback(conn, id)
        })
    }

    /// Returns false if the id does not exist.
    pub fn delete_feedback(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM feedback WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password: row.get(1)?,
                email: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                session_nonce: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_feedback(conn: &Connection, id: i64) -> Result<Option<FeedbackRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = ?1"))?;
    let row = stmt.query_row([id], feedback_from_row).optional()?;
    Ok(row)
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<FeedbackRow> {
    Ok(FeedbackRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        username: row.get(3)?,
        created_at: row.get(4)?,
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
