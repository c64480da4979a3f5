//! In-memory session store for ephemeral sessions and tests.

use super::{SessionStore, StoreResult};
use std::collections::BTreeMap;

/// `BTreeMap`-backed session store. Contents live as long as the value.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    items: BTreeMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StoreResult<()> {
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.keys().cloned().collect())
    }
}
