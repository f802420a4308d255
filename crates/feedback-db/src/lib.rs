pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::init(conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Cascade deletes of feedback depend on this.
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

/// If `err` is a UNIQUE or PRIMARY KEY constraint failure, return the
/// offending column name (e.g. `"email"` for `users.email`).
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    let rusqlite::Error::SqliteFailure(failure, Some(message)) = err.downcast_ref::<rusqlite::Error>()?
    else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }

    // "UNIQUE constraint failed: users.email"
    let columns = message
        .strip_prefix("UNIQUE constraint failed: ")
        .or_else(|| message.strip_prefix("PRIMARY KEY constraint failed: "))?;
    let first = columns.split(',').next()?.trim();
    let column = first.rsplit('.').next().unwrap_or(first);
    Some(column.to_string())
}
