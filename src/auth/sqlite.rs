// Token persistence in a SQLite database

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::store::TokenStore;
use super::token::Token;
use crate::error::{KronosError, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS access_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject TEXT NOT NULL,
    access_token TEXT NOT NULL,
    payload TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

/// Token store backed by a SQLite file, one row per cached token
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        tracing::debug!("Opening token database: {}", path.display());
        let conn = Connection::open(path).map_err(|e| {
            KronosError::Storage(format!(
                "Failed to open SQLite database {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| KronosError::Storage("token database lock poisoned".to_string()))
    }
}

impl TokenStore for SqliteTokenStore {
    fn list(&self, subject: &str) -> Result<Vec<Token>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT payload FROM access_tokens WHERE subject = ? ORDER BY id DESC")?;
        let payloads = stmt
            .query_map([subject], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let tokens = payloads
            .iter()
            .filter_map(|payload| match Token::from_json(payload) {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::warn!(subject = %subject, "Skipping unreadable stored token: {}", e);
                    None
                }
            })
            .collect();

        Ok(tokens)
    }

    fn save(&self, subject: &str, token: &Token) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM access_tokens WHERE subject = ?", [subject])?;
        tx.execute(
            "INSERT INTO access_tokens (subject, access_token, payload) VALUES (?1, ?2, ?3)",
            params![subject, token.value(), token.to_json()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, subject: &str, token: &Token) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM access_tokens WHERE subject = ?1 AND access_token = ?2",
            params![subject, token.value()],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTokenStore").finish_non_exhaustive()
    }
}
