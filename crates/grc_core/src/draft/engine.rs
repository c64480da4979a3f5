//! Mapping draft engine.
//!
//! # Responsibility
//! - Seed a draft from a validated baseline or from a persisted session copy.
//! - Apply add/reweight/remove edits and persist after each edit.
//! - Export the draft document as JSON.
//!
//! # Invariants
//! - A control id appears at most once per requirement in the draft.
//! - Weight updates are clamped to `0..=MAX_WEIGHT`.
//! - Persistence is best-effort: failures are logged and remembered in
//!   `last_persist_error`, never returned from edits.

use super::changes::{changes_for, DraftSummary, MappingChange};
use crate::model::mapping::{
    ControlId, MappingDiff, MappingRow, MappingSet, MappingValidationError, RequirementId,
    DEFAULT_WEIGHT, MAX_WEIGHT,
};
use crate::storage::{draft_key, SessionStore};
use crate::weights::{normalize_to_100, WeightedItem};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Errors surfaced by draft construction and export.
#[derive(Debug)]
pub enum DraftError {
    /// Baseline violates mapping invariants.
    InvalidBaseline(MappingValidationError),
    Serialize(serde_json::Error),
    Io(std::io::Error),
}

impl Display for DraftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBaseline(err) => write!(f, "invalid mapping baseline: {err}"),
            Self::Serialize(err) => write!(f, "failed to serialize mapping draft: {err}"),
            Self::Io(err) => write!(f, "failed to write mapping draft export: {err}"),
        }
    }
}

impl Error for DraftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBaseline(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<MappingValidationError> for DraftError {
    fn from(value: MappingValidationError) -> Self {
        Self::InvalidBaseline(value)
    }
}

impl From<serde_json::Error> for DraftError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<std::io::Error> for DraftError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Where the draft content came from when it was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    /// Restored from the session store.
    Persisted,
    /// Cloned from the baseline.
    Baseline,
}

impl DraftSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Persisted => "persisted",
            Self::Baseline => "baseline",
        }
    }
}

/// Editable mapping draft over an immutable baseline.
pub struct MappingDraft<S: SessionStore> {
    base: MappingSet,
    draft: MappingSet,
    store: S,
    source: DraftSource,
    last_persist_error: Option<String>,
}

impl<S: SessionStore> MappingDraft<S> {
    /// Opens a draft for `base`, restoring a persisted copy when one exists.
    ///
    /// A persisted copy that cannot be read, parsed or validated, or that
    /// belongs to another version, is ignored and the baseline is used.
    ///
    /// # Errors
    /// - `InvalidBaseline` when `base` violates mapping invariants.
    pub fn open(base: MappingSet, store: S) -> Result<Self, DraftError> {
        base.validate()?;

        let mut last_persist_error = None;
        let restored = match store.get_item(&draft_key(base.version_id)) {
            Ok(Some(raw)) => restore_persisted(&raw, base.version_id),
            Ok(None) => None,
            Err(err) => {
                warn!(
                    "event=draft_load module=mapping status=error version_id={} error={}",
                    base.version_id, err
                );
                last_persist_error = Some(err.to_string());
                None
            }
        };

        let (draft, source) = match restored {
            Some(draft) => (draft, DraftSource::Persisted),
            None => (base.clone(), DraftSource::Baseline),
        };

        info!(
            "event=draft_open module=mapping status=ok version_id={} source={} requirements={}",
            base.version_id,
            source.as_str(),
            draft.requirements.len()
        );

        Ok(Self {
            base,
            draft,
            store,
            source,
            last_persist_error,
        })
    }

    pub fn version_id(&self) -> i64 {
        self.base.version_id
    }

    /// Session storage key of this draft (`mm_draft_v<versionId>`).
    pub fn storage_key(&self) -> String {
        draft_key(self.base.version_id)
    }

    pub fn source(&self) -> DraftSource {
        self.source
    }

    pub fn base(&self) -> &MappingSet {
        &self.base
    }

    pub fn draft(&self) -> &MappingSet {
        &self.draft
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Error message of the most recent failed storage access, cleared by the
    /// next successful write.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Appends a mapping unless the control is already mapped.
    ///
    /// Returns `true` when a row was added. Duplicates and blank requirement
    /// ids are no-ops and skip the storage write.
    pub fn add_mapping(&mut self, requirement_id: &str, control_id: ControlId, weight: u32) -> bool {
        if requirement_id.trim().is_empty() {
            debug!("event=draft_add module=mapping status=skipped reason=blank_requirement");
            return false;
        }

        let rows = self
            .draft
            .requirements
            .entry(requirement_id.to_string())
            .or_default();
        if rows.iter().any(|row| row.control_id == control_id) {
            return false;
        }
        rows.push(MappingRow::new(control_id, weight));

        self.persist();
        true
    }

    /// Adds a mapping with the default weight.
    pub fn add_default_mapping(&mut self, requirement_id: &str, control_id: ControlId) -> bool {
        self.add_mapping(requirement_id, control_id, DEFAULT_WEIGHT)
    }

    /// Sets the weight of an existing row, clamped to `0..=MAX_WEIGHT`.
    ///
    /// Returns `false` without writing when the row does not exist.
    pub fn update_weight(&mut self, requirement_id: &str, control_id: ControlId, weight: i64) -> bool {
        let clamped = weight.clamp(0, i64::from(MAX_WEIGHT)) as u32;
        let Some(row) = self
            .draft
            .requirements
            .get_mut(requirement_id)
            .and_then(|rows| rows.iter_mut().find(|row| row.control_id == control_id))
        else {
            return false;
        };
        row.weight = clamped;

        self.persist();
        true
    }

    /// Removes a row if present and persists either way.
    ///
    /// Returns `true` when a row was removed.
    pub fn remove_mapping(&mut self, requirement_id: &str, control_id: ControlId) -> bool {
        let removed = match self.draft.requirements.get_mut(requirement_id) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|row| row.control_id != control_id);
                rows.len() != before
            }
            None => false,
        };

        self.persist();
        removed
    }

    /// Current draft rows of a requirement, empty when unknown.
    pub fn get_for_requirement(&self, requirement_id: &str) -> &[MappingRow] {
        self.draft.rows(requirement_id)
    }

    /// Baseline rows of a requirement, empty when unknown.
    pub fn get_base_for_requirement(&self, requirement_id: &str) -> &[MappingRow] {
        self.base.rows(requirement_id)
    }

    pub fn diff_for_requirement(&self, requirement_id: &str) -> MappingDiff {
        MappingDiff::between(
            self.get_base_for_requirement(requirement_id),
            self.get_for_requirement(requirement_id),
        )
    }

    /// Sum of draft weights for a requirement.
    pub fn total_weight(&self, requirement_id: &str) -> u64 {
        self.get_for_requirement(requirement_id)
            .iter()
            .map(|row| u64::from(row.weight))
            .sum()
    }

    /// Rescales a requirement's draft weights to sum to 100, keeping order.
    ///
    /// Returns `false` without writing for unknown or empty requirements.
    pub fn normalize_requirement(&mut self, requirement_id: &str) -> bool {
        let Some(rows) = self.draft.requirements.get_mut(requirement_id) else {
            return false;
        };
        if rows.is_empty() {
            return false;
        }

        let items: Vec<WeightedItem<ControlId>> = rows
            .iter()
            .map(|row| WeightedItem::new(row.control_id, row.weight))
            .collect();
        for (row, item) in rows.iter_mut().zip(normalize_to_100(&items)) {
            row.weight = item.weight;
        }

        self.persist();
        true
    }

    /// Requirement ids known to the baseline or the draft, sorted.
    pub fn requirement_ids(&self) -> Vec<RequirementId> {
        self.base
            .requirements
            .keys()
            .chain(self.draft.requirements.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Diffs of every requirement that differs from the baseline.
    pub fn diff_summary(&self) -> DraftSummary {
        let mut summary = DraftSummary::default();
        for requirement_id in self.requirement_ids() {
            let diff = self.diff_for_requirement(&requirement_id);
            summary.push(requirement_id, diff);
        }
        summary
    }

    pub fn is_dirty(&self) -> bool {
        self.requirement_ids()
            .iter()
            .any(|requirement_id| !self.diff_for_requirement(requirement_id).is_empty())
    }

    /// Edits turning the baseline into the draft, sorted by requirement id
    /// then control id.
    pub fn pending_changes(&self) -> Vec<MappingChange> {
        self.requirement_ids()
            .iter()
            .flat_map(|requirement_id| {
                changes_for(
                    requirement_id,
                    self.get_base_for_requirement(requirement_id),
                    self.get_for_requirement(requirement_id),
                )
            })
            .collect()
    }

    /// Drops the persisted copy and reseeds the draft from the baseline.
    pub fn reset_draft(&mut self) {
        let key = self.storage_key();
        match self.store.remove_item(&key) {
            Ok(()) => self.last_persist_error = None,
            Err(err) => {
                warn!(
                    "event=draft_reset module=mapping status=error version_id={} error={}",
                    self.base.version_id, err
                );
                self.last_persist_error = Some(err.to_string());
            }
        }
        self.draft = self.base.clone();
        self.source = DraftSource::Baseline;
        info!(
            "event=draft_reset module=mapping status=ok version_id={}",
            self.base.version_id
        );
    }

    /// Serializes the whole draft document as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, DraftError> {
        Ok(serde_json::to_string_pretty(&self.draft)?)
    }

    /// Writes the exported document to `<dir>/mapping_draft_v<versionId>.json`.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, DraftError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("mapping_draft_v{}.json", self.base.version_id));
        std::fs::write(&path, self.export_json()?)?;
        info!(
            "event=draft_export module=mapping status=ok version_id={}",
            self.base.version_id
        );
        Ok(path)
    }

    fn persist(&mut self) {
        let key = self.storage_key();
        let outcome = serde_json::to_string(&self.draft)
            .map_err(|err| err.to_string())
            .and_then(|raw| {
                self.store
                    .set_item(&key, &raw)
                    .map_err(|err| err.to_string())
            });

        match outcome {
            Ok(()) => self.last_persist_error = None,
            Err(message) => {
                warn!(
                    "event=draft_persist module=mapping status=error version_id={} error={}",
                    self.base.version_id, message
                );
                self.last_persist_error = Some(message);
            }
        }
    }
}

fn restore_persisted(raw: &str, version_id: i64) -> Option<MappingSet> {
    let persisted: MappingSet = match serde_json::from_str(raw) {
        Ok(set) => set,
        Err(err) => {
            warn!(
                "event=draft_load module=mapping status=discarded version_id={} reason=parse error={}",
                version_id, err
            );
            return None;
        }
    };
    if persisted.version_id != version_id {
        warn!(
            "event=draft_load module=mapping status=discarded version_id={} reason=version_mismatch persisted_version_id={}",
            version_id, persisted.version_id
        );
        return None;
    }
    if let Err(err) = persisted.validate() {
        warn!(
            "event=draft_load module=mapping status=discarded version_id={} reason=invalid error={}",
            version_id, err
        );
        return None;
    }
    Some(persisted)
}
