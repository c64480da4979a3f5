//! Recent-activity feed shown on the console dashboard.
//!
//! # Invariants
//! - Entries are kept newest first and bounded by the feed capacity.
//! - Persistence is best-effort, like mapping drafts.

mod feed;

pub use feed::{
    ActivityAction, ActivityEntry, ActivityError, ActivityFeed, ActivityKind,
    DEFAULT_FEED_CAPACITY,
};
