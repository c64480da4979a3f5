//! Session-persisted activity feed.

use crate::storage::{SessionStore, ACTIVITY_FEED_KEY};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Entries kept when no capacity is configured.
pub const DEFAULT_FEED_CAPACITY: usize = 50;

/// Console area an activity entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Asset,
    Risk,
    Control,
    Compliance,
    Evidence,
    Mapping,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Risk => "risk",
            Self::Control => "control",
            Self::Compliance => "compliance",
            Self::Evidence => "evidence",
            Self::Mapping => "mapping",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "risk" => Some(Self::Risk),
            "control" => Some(Self::Control),
            "compliance" => Some(Self::Compliance),
            "evidence" => Some(Self::Evidence),
            "mapping" => Some(Self::Mapping),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Exported,
    Reset,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Exported => "exported",
            Self::Reset => "reset",
        }
    }
}

/// One line of the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    /// Unix epoch milliseconds.
    pub at_ms: i64,
    pub kind: ActivityKind,
    pub action: ActivityAction,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    EmptyLabel,
}

impl Display for ActivityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "activity label must not be blank"),
        }
    }
}

impl Error for ActivityError {}

/// Bounded, newest-first activity list persisted under `activity_feed`.
pub struct ActivityFeed<S: SessionStore> {
    store: S,
    capacity: usize,
    entries: Vec<ActivityEntry>,
}

impl<S: SessionStore> ActivityFeed<S> {
    /// Loads the feed from `store`. Unreadable or corrupt data yields an
    /// empty feed. A capacity of 0 is treated as 1.
    pub fn open(store: S, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = match store.get_item(ACTIVITY_FEED_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<ActivityEntry>>(&raw).unwrap_or_else(|err| {
                warn!("event=feed_load module=activity status=discarded reason=parse error={err}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("event=feed_load module=activity status=error error={err}");
                Vec::new()
            }
        };
        entries.truncate(capacity);

        Self {
            store,
            capacity,
            entries,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepends an entry, trims to capacity and persists.
    pub fn record(
        &mut self,
        kind: ActivityKind,
        action: ActivityAction,
        label: impl Into<String>,
    ) -> Result<ActivityEntry, ActivityError> {
        let label = label.into();
        let label = label.trim();
        if label.is_empty() {
            return Err(ActivityError::EmptyLabel);
        }

        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            at_ms: now_epoch_ms(),
            kind,
            action,
            label: label.to_string(),
        };
        self.entries.insert(0, entry.clone());
        self.entries.truncate(self.capacity);
        debug!(
            "event=feed_record module=activity status=ok kind={} action={} size={}",
            kind.as_str(),
            action.as_str(),
            self.entries.len()
        );

        self.persist();
        Ok(entry)
    }

    /// Newest entries, at most `limit`.
    pub fn recent(&self, limit: usize) -> &[ActivityEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Empties the feed and drops the persisted copy.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(err) = self.store.remove_item(ACTIVITY_FEED_KEY) {
            warn!("event=feed_clear module=activity status=error error={err}");
        }
    }

    fn persist(&mut self) {
        let outcome = serde_json::to_string(&self.entries)
            .map_err(|err| err.to_string())
            .and_then(|raw| {
                self.store
                    .set_item(ACTIVITY_FEED_KEY, &raw)
                    .map_err(|err| err.to_string())
            });
        if let Err(message) = outcome {
            warn!("event=feed_persist module=activity status=error error={message}");
        }
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
