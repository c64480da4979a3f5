//! SQLite-backed session store.
//!
//! # Invariants
//! - Every statement is constrained to the store's `session_id`.
//! - Construction fails on connections that skipped migrations.

use super::{SessionStore, StoreError, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use rusqlite::{params, Connection, OptionalExtension};

/// Session store persisting items in the `session_items` table.
pub struct SqliteSessionStore<'conn> {
    conn: &'conn Connection,
    session_id: String,
}

impl<'conn> SqliteSessionStore<'conn> {
    /// Creates a store bound to one session on a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match.
    pub fn try_new(conn: &'conn Connection, session_id: impl Into<String>) -> StoreResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        Ok(Self {
            conn,
            session_id: session_id.into(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Deletes every item of this session. Returns the number of removed rows.
    pub fn clear_session(&mut self) -> StoreResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM session_items WHERE session_id = ?1;",
            [self.session_id.as_str()],
        )?;
        Ok(removed)
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM session_items WHERE session_id = ?1 AND key = ?2;",
                params![self.session_id.as_str(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO session_items (session_id, key, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (session_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![self.session_id.as_str(), key, value],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM session_items WHERE session_id = ?1 AND key = ?2;",
            params![self.session_id.as_str(), key],
        )?;
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM session_items WHERE session_id = ?1 ORDER BY key ASC;")?;
        let mut rows = stmt.query([self.session_id.as_str()])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }
}
