//! Local core of the GRC administration console.
//! Mapping drafts, weight normalization, the activity feed and session
//! storage live here; the REST backend and UI are external.

pub mod activity;
pub mod config;
pub mod db;
pub mod draft;
pub mod logging;
pub mod model;
pub mod storage;
pub mod weights;

pub use activity::{
    ActivityAction, ActivityEntry, ActivityError, ActivityFeed, ActivityKind,
    DEFAULT_FEED_CAPACITY,
};
pub use config::{ConfigError, ConsoleConfig};
pub use draft::{DraftError, DraftSource, DraftSummary, MappingChange, MappingDraft};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::mapping::{
    ControlId, MappingDiff, MappingRow, MappingSet, MappingValidationError, RequirementId,
    DEFAULT_WEIGHT, MAX_WEIGHT,
};
pub use storage::{
    draft_key, draft_versions, MemorySessionStore, SessionStore, SqliteSessionStore, StoreError,
    StoreResult,
};
pub use weights::{normalize_to_100, WeightedItem};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
