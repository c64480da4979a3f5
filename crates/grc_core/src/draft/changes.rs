//! Change list and summary derived from a baseline/draft pair.

use crate::model::mapping::{ControlId, MappingDiff, MappingRow, RequirementId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pending edit relative to the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MappingChange {
    Added {
        requirement_id: RequirementId,
        control_id: ControlId,
        weight: u32,
    },
    Removed {
        requirement_id: RequirementId,
        control_id: ControlId,
    },
    Reweighted {
        requirement_id: RequirementId,
        control_id: ControlId,
        from: u32,
        to: u32,
    },
}

impl MappingChange {
    pub fn requirement_id(&self) -> &str {
        match self {
            Self::Added { requirement_id, .. }
            | Self::Removed { requirement_id, .. }
            | Self::Reweighted { requirement_id, .. } => requirement_id,
        }
    }

    pub fn control_id(&self) -> ControlId {
        match self {
            Self::Added { control_id, .. }
            | Self::Removed { control_id, .. }
            | Self::Reweighted { control_id, .. } => *control_id,
        }
    }
}

/// Diffs of every changed requirement plus aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSummary {
    /// Requirements with a non-empty diff, sorted by id.
    pub requirements: Vec<(RequirementId, MappingDiff)>,
    /// Sum of all per-requirement counts.
    pub totals: MappingDiff,
}

impl DraftSummary {
    pub(crate) fn push(&mut self, requirement_id: RequirementId, diff: MappingDiff) {
        if diff.is_empty() {
            return;
        }
        self.totals.added += diff.added;
        self.totals.removed += diff.removed;
        self.totals.changed += diff.changed;
        self.totals.total += diff.total;
        self.requirements.push((requirement_id, diff));
    }
}

/// Lists the edits turning `base` into `draft` for one requirement, sorted by
/// control id.
pub(crate) fn changes_for(
    requirement_id: &str,
    base: &[MappingRow],
    draft: &[MappingRow],
) -> Vec<MappingChange> {
    let base_weights: BTreeMap<ControlId, u32> =
        base.iter().map(|row| (row.control_id, row.weight)).collect();
    let draft_weights: BTreeMap<ControlId, u32> =
        draft.iter().map(|row| (row.control_id, row.weight)).collect();

    let mut changes = Vec::new();
    for (&control_id, &weight) in &draft_weights {
        match base_weights.get(&control_id) {
            None => changes.push(MappingChange::Added {
                requirement_id: requirement_id.to_string(),
                control_id,
                weight,
            }),
            Some(&from) if from != weight => changes.push(MappingChange::Reweighted {
                requirement_id: requirement_id.to_string(),
                control_id,
                from,
                to: weight,
            }),
            Some(_) => {}
        }
    }
    for &control_id in base_weights.keys() {
        if !draft_weights.contains_key(&control_id) {
            changes.push(MappingChange::Removed {
                requirement_id: requirement_id.to_string(),
                control_id,
            });
        }
    }
    changes.sort_by_key(MappingChange::control_id);
    changes
}

#[cfg(test)]
mod tests {
    use super::{changes_for, MappingChange};
    use crate::model::mapping::MappingRow;

    #[test]
    fn changes_are_sorted_by_control_id() {
        let base = vec![MappingRow::new(5, 10), MappingRow::new(2, 10)];
        let draft = vec![MappingRow::new(2, 30), MappingRow::new(1, 10)];

        let changes = changes_for("A.1", &base, &draft);
        let controls: Vec<i64> = changes.iter().map(MappingChange::control_id).collect();
        assert_eq!(controls, vec![1, 2, 5]);
        assert!(matches!(
            changes[1],
            MappingChange::Reweighted { from: 10, to: 30, .. }
        ));
        assert!(matches!(changes[2], MappingChange::Removed { .. }));
    }

    #[test]
    fn change_serializes_with_op_tag() {
        let change = MappingChange::Removed {
            requirement_id: "A.1".to_string(),
            control_id: 9,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["op"], "removed");
        assert_eq!(json["control_id"], 9);
    }
}
