//! SQLite-backed store adapter.
//!
//! One table, `entries(key TEXT PRIMARY KEY, value TEXT NOT NULL)`.
//! Opened against a file this is the durable store and survives
//! process restarts; opened in memory it is the session store and
//! lives exactly as long as the process. Ordinal enumeration follows
//! `rowid` order, so a re-inserted key moves to the end.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::backend::Backend;
use crate::error::Result;

/// Key/value adapter over a rusqlite connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) a file-backed store.
    ///
    /// # Errors
    ///
    /// Returns `StashError::Storage` if the file cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a store that lives only in process memory.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entries (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(Self { conn })
    }
}

impl Backend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        // Delete-then-insert rather than upsert so an overwritten key
        // takes a fresh rowid and moves to the end of enumeration,
        // matching the other adapters' observable order churn.
        self.conn
            .execute("DELETE FROM entries WHERE key = ?1", [key])?;
        self.conn.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM entries WHERE key = ?1", [key])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM entries", [])?;
        debug!(entries = deleted, "sqlite_backend.clear");
        Ok(())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        let key = self
            .conn
            .query_row(
                "SELECT key FROM entries ORDER BY rowid LIMIT 1 OFFSET ?1",
                [index as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key)
    }

    fn len(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT count(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
