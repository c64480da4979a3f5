//! Mapping set document and per-requirement diff.
//!
//! # Responsibility
//! - Define the `MappingSet` document shared by baseline and draft.
//! - Validate mapping invariants before a document is used or persisted.
//! - Compute order-independent diffs between two mapping lists.
//!
//! # Invariants
//! - `control_id` is unique within one requirement's list.
//! - List order is preserved; diffs ignore it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifier of a compliance-framework requirement (clause/article).
pub type RequirementId = String;
/// Identifier of a control as assigned by the backend.
pub type ControlId = i64;

/// Default weight given to a newly added mapping.
pub const DEFAULT_WEIGHT: u32 = 100;
/// Upper bound applied by weight updates.
pub const MAX_WEIGHT: u32 = 1000;

/// One control mapped to a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub control_id: ControlId,
    pub weight: u32,
}

impl MappingRow {
    pub fn new(control_id: ControlId, weight: u32) -> Self {
        Self { control_id, weight }
    }
}

/// Versioned set of requirement-to-control mappings.
///
/// Serialized as `{"versionId": .., "requirements": {"<req>": [..]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSet {
    #[serde(rename = "versionId")]
    pub version_id: i64,
    #[serde(default)]
    pub requirements: BTreeMap<RequirementId, Vec<MappingRow>>,
}

/// Validation error for mapping set invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingValidationError {
    BlankRequirementId,
    DuplicateControl {
        requirement_id: RequirementId,
        control_id: ControlId,
    },
}

impl Display for MappingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankRequirementId => write!(f, "requirement id must not be blank"),
            Self::DuplicateControl {
                requirement_id,
                control_id,
            } => write!(
                f,
                "control {control_id} is mapped more than once to requirement `{requirement_id}`"
            ),
        }
    }
}

impl Error for MappingValidationError {}

impl MappingSet {
    pub fn new(version_id: i64) -> Self {
        Self {
            version_id,
            requirements: BTreeMap::new(),
        }
    }

    /// Returns the rows of one requirement, empty for unknown ids.
    pub fn rows(&self, requirement_id: &str) -> &[MappingRow] {
        self.requirements
            .get(requirement_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Checks requirement ids and per-requirement control uniqueness.
    pub fn validate(&self) -> Result<(), MappingValidationError> {
        for (requirement_id, rows) in &self.requirements {
            if requirement_id.trim().is_empty() {
                return Err(MappingValidationError::BlankRequirementId);
            }
            let mut seen = HashSet::with_capacity(rows.len());
            for row in rows {
                if !seen.insert(row.control_id) {
                    return Err(MappingValidationError::DuplicateControl {
                        requirement_id: requirement_id.clone(),
                        control_id: row.control_id,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Change counts between a baseline list and a draft list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDiff {
    /// Controls present in the draft only.
    pub added: usize,
    /// Controls present in the baseline only.
    pub removed: usize,
    /// Controls present in both with a different weight.
    pub changed: usize,
    /// `added + removed + changed`.
    pub total: usize,
}

impl MappingDiff {
    /// Diffs two lists by `control_id`, ignoring order.
    pub fn between(base: &[MappingRow], draft: &[MappingRow]) -> Self {
        let base_weights = weight_map(base);
        let draft_weights = weight_map(draft);

        let mut added = 0;
        let mut changed = 0;
        for (control_id, weight) in &draft_weights {
            match base_weights.get(control_id) {
                None => added += 1,
                Some(base_weight) if base_weight != weight => changed += 1,
                Some(_) => {}
            }
        }
        let removed = base_weights
            .keys()
            .filter(|control_id| !draft_weights.contains_key(control_id))
            .count();

        Self {
            added,
            removed,
            changed,
            total: added + removed + changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn weight_map(rows: &[MappingRow]) -> HashMap<ControlId, u32> {
    rows.iter().map(|row| (row.control_id, row.weight)).collect()
}

#[cfg(test)]
mod tests {
    use super::{MappingDiff, MappingRow, MappingSet, MappingValidationError};

    fn rows(pairs: &[(i64, u32)]) -> Vec<MappingRow> {
        pairs
            .iter()
            .map(|&(control_id, weight)| MappingRow::new(control_id, weight))
            .collect()
    }

    #[test]
    fn diff_counts_added_and_changed() {
        let diff = MappingDiff::between(&rows(&[(1, 100)]), &rows(&[(1, 50), (2, 50)]));
        assert_eq!(
            diff,
            MappingDiff {
                added: 1,
                removed: 0,
                changed: 1,
                total: 2
            }
        );
    }

    #[test]
    fn diff_against_itself_is_empty() {
        let list = rows(&[(3, 10), (1, 20), (7, 0)]);
        assert!(MappingDiff::between(&list, &list).is_empty());
    }

    #[test]
    fn diff_ignores_order() {
        let base = rows(&[(1, 10), (2, 20), (3, 30)]);
        let draft = rows(&[(3, 30), (1, 10), (2, 20)]);
        assert!(MappingDiff::between(&base, &draft).is_empty());
    }

    #[test]
    fn diff_counts_removed() {
        let diff = MappingDiff::between(&rows(&[(1, 10), (2, 20)]), &rows(&[(2, 20)]));
        assert_eq!(diff.removed, 1);
        assert_eq!(diff.total, 1);
    }

    #[test]
    fn validate_rejects_duplicate_controls() {
        let mut set = MappingSet::new(1);
        set.requirements
            .insert("A.5.1".to_string(), rows(&[(4, 10), (4, 20)]));
        assert_eq!(
            set.validate(),
            Err(MappingValidationError::DuplicateControl {
                requirement_id: "A.5.1".to_string(),
                control_id: 4
            })
        );
    }

    #[test]
    fn validate_rejects_blank_requirement() {
        let mut set = MappingSet::new(1);
        set.requirements.insert("  ".to_string(), Vec::new());
        assert_eq!(
            set.validate(),
            Err(MappingValidationError::BlankRequirementId)
        );
    }

    #[test]
    fn serializes_with_version_id_key() {
        let mut set = MappingSet::new(7);
        set.requirements
            .insert("A.5.1".to_string(), rows(&[(12, 100)]));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"{"versionId":7,"requirements":{"A.5.1":[{"control_id":12,"weight":100}]}}"#
        );
    }
}
