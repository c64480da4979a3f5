//! Domain model for requirement-to-control crosswalk mappings.
//!
//! # Invariants
//! - Within one requirement, a control id appears at most once.
//! - Requirement ids are non-blank.

pub mod mapping;
