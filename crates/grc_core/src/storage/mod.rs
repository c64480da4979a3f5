//! Local per-session key-value storage.
//!
//! # Responsibility
//! - Define the `SessionStore` contract used by drafts and the activity feed.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - Keys are scoped to exactly one session; sessions never see each other's
//!   items.
//! - `set_item` replaces any previous value for the key.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key prefix for persisted mapping drafts (`mm_draft_v<versionId>`).
pub const DRAFT_KEY_PREFIX: &str = "mm_draft_v";
/// Key holding the serialized activity feed.
pub const ACTIVITY_FEED_KEY: &str = "activity_feed";

static DRAFT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^mm_draft_v(-?\d+)$").expect("valid draft key regex"));

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer error for session item reads and writes.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Connection has not been migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Backend refused the operation (quota, read-only medium, ...).
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "session store requires schema version {expected_version}, connection is at {actual_version}"
            ),
            Self::Unavailable(message) => write!(f, "session store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-value storage scoped to one console session.
pub trait SessionStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()>;
    /// Removes one key. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> StoreResult<()>;
    /// Returns all keys of the session in ascending order.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

impl<S: SessionStore + ?Sized> SessionStore for &mut S {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}

/// Builds the storage key for a mapping draft of the given version.
pub fn draft_key(version_id: i64) -> String {
    format!("{DRAFT_KEY_PREFIX}{version_id}")
}

/// Parses a draft storage key back into its version id.
pub fn parse_draft_key(key: &str) -> Option<i64> {
    DRAFT_KEY_RE
        .captures(key)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Lists version ids that currently have a persisted draft, ascending.
pub fn draft_versions<S: SessionStore + ?Sized>(store: &S) -> StoreResult<Vec<i64>> {
    let mut versions: Vec<i64> = store
        .keys()?
        .iter()
        .filter_map(|key| parse_draft_key(key))
        .collect();
    versions.sort_unstable();
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::{draft_key, draft_versions, parse_draft_key, MemorySessionStore, SessionStore};

    #[test]
    fn draft_key_round_trips_through_parser() {
        assert_eq!(draft_key(42), "mm_draft_v42");
        assert_eq!(parse_draft_key("mm_draft_v42"), Some(42));
    }

    #[test]
    fn parse_draft_key_rejects_foreign_keys() {
        assert_eq!(parse_draft_key("activity_feed"), None);
        assert_eq!(parse_draft_key("mm_draft_v"), None);
        assert_eq!(parse_draft_key("mm_draft_v12x"), None);
        assert_eq!(parse_draft_key("xmm_draft_v12"), None);
    }

    #[test]
    fn draft_versions_lists_only_draft_keys_in_order() {
        let mut store = MemorySessionStore::new();
        store.set_item("mm_draft_v9", "{}").unwrap();
        store.set_item("activity_feed", "[]").unwrap();
        store.set_item("mm_draft_v3", "{}").unwrap();

        assert_eq!(draft_versions(&store).unwrap(), vec![3, 9]);
    }
}
