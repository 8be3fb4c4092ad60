//! SQLite-backed session store

use crate::StoreError;
use carehero_domain::{now_secs, PatientRecord, SessionStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::warn;

/// SQLite-based implementation of SessionStore
///
/// Each record is stored as one compact JSON document. Rows that fail to
/// decode are reported and treated as missing.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store through
/// `Arc<Mutex<_>>` or give each thread its own instance.
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Open (or create) a store at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use carehero_store::SqliteSessionStore;
    ///
    /// let store = SqliteSessionStore::new("sessions.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Delete sessions not written for more than `ttl_secs`
    pub fn purge_older_than(&mut self, ttl_secs: u64) -> Result<usize, StoreError> {
        let cutoff = now_secs().saturating_sub(ttl_secs) as i64;
        let purged = self
            .conn
            .execute("DELETE FROM sessions WHERE updated_at < ?1", params![cutoff])?;
        Ok(purged)
    }
}

impl SessionStore for SqliteSessionStore {
    type Error = StoreError;

    fn get(&self, session_id: &str) -> Result<Option<PatientRecord>, Self::Error> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<PatientRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(session_id, error = %e, "Malformed session record treated as missing");
                Ok(None)
            }
        }
    }

    fn put(&mut self, record: PatientRecord) -> Result<(), Self::Error> {
        let json = serde_json::to_string(&record)?;
        self.conn.execute(
            "INSERT INTO sessions (session_id, record, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
             record = excluded.record, updated_at = excluded.updated_at",
            params![
                record.session_id(),
                json,
                record.created_at() as i64,
                now_secs() as i64,
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, session_id: &str) -> Result<bool, Self::Error> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        Ok(removed > 0)
    }

    fn session_ids(&self) -> Result<Vec<String>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_id FROM sessions ORDER BY updated_at, session_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}
