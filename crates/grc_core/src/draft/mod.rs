//! Client-side mapping drafts edited against a server baseline.
//!
//! # Responsibility
//! - Keep an editable copy of a baseline `MappingSet` in session storage.
//! - Report per-requirement diffs and the change list for a later save.
//!
//! # Invariants
//! - The baseline is never mutated after a draft is opened.
//! - Storage failures never fail an edit; they only mark the draft unsaved.

mod changes;
mod engine;

pub use changes::{DraftSummary, MappingChange};
pub use engine::{DraftError, DraftSource, MappingDraft};
