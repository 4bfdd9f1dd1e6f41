//! Reconciliation of a target tag plan against the tags that exist
//!
//! Existing state is only consulted by looking up the names in the plan, so
//! tags outside the plan (older series, unrelated tags) can never show up in
//! the output.

use crate::domain::{CommitId, TagPlan, TagRef};
use crate::error::{Result, SemrelError};
use std::collections::BTreeMap;

/// Snapshot of existing tags: name -> referenced commit
pub type TagSnapshot = BTreeMap<String, CommitId>;

/// One action needed to bring a tag to its target state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationEntry {
    Create(TagRef),
    /// Force re-point an existing tag
    Move { from: CommitId, to: TagRef },
    Unchanged(TagRef),
}

impl ReconciliationEntry {
    pub fn tag(&self) -> &TagRef {
        match self {
            ReconciliationEntry::Create(tag) => tag,
            ReconciliationEntry::Move { to, .. } => to,
            ReconciliationEntry::Unchanged(tag) => tag,
        }
    }

    /// True for entries that change tag storage
    pub fn is_change(&self) -> bool {
        !matches!(self, ReconciliationEntry::Unchanged(_))
    }
}

/// Ordered reconciliation: canonical entry first, then convenience entries
/// narrowest scope first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub canonical: ReconciliationEntry,
    pub convenience: Vec<ReconciliationEntry>,
}

impl ReconciliationPlan {
    pub fn entries(&self) -> impl Iterator<Item = &ReconciliationEntry> {
        std::iter::once(&self.canonical).chain(self.convenience.iter())
    }

    /// Entries that change tag storage, in plan order
    pub fn changes(&self) -> impl Iterator<Item = &ReconciliationEntry> {
        self.entries().filter(|e| e.is_change())
    }

    /// True when every tag is already where it should be
    pub fn is_noop(&self) -> bool {
        self.changes().next().is_none()
    }

    /// Point every entry at `commit`, as needed once the release commit has
    /// advanced HEAD past the commit the plan was computed for.
    ///
    /// # Errors
    /// `TagConflict` when the canonical tag already exists at another commit.
    pub fn retarget(&self, commit: &CommitId) -> Result<ReconciliationPlan> {
        let canonical = match &self.canonical {
            ReconciliationEntry::Unchanged(tag) if &tag.commit != commit => {
                return Err(SemrelError::TagConflict {
                    tag: tag.name.clone(),
                    existing: tag.commit.clone(),
                    target: commit.clone(),
                });
            }
            entry => retarget_entry(entry, commit),
        };

        Ok(ReconciliationPlan {
            canonical,
            convenience: self
                .convenience
                .iter()
                .map(|entry| retarget_entry(entry, commit))
                .collect(),
        })
    }
}

fn retarget_entry(entry: &ReconciliationEntry, commit: &CommitId) -> ReconciliationEntry {
    let to = TagRef::new(entry.tag().name.clone(), commit.clone());
    match entry {
        ReconciliationEntry::Create(_) => ReconciliationEntry::Create(to),
        ReconciliationEntry::Move { from, .. } => ReconciliationEntry::Move {
            from: from.clone(),
            to,
        },
        ReconciliationEntry::Unchanged(tag) if &tag.commit == commit => {
            ReconciliationEntry::Unchanged(to)
        }
        ReconciliationEntry::Unchanged(tag) => ReconciliationEntry::Move {
            from: tag.commit.clone(),
            to,
        },
    }
}

/// Compute the actions needed to reach `target` from `existing`.
///
/// # Errors
/// `TagConflict` when the canonical tag exists at a different commit. A
/// canonical tag is never moved.
pub fn reconcile(target: &TagPlan, existing: &TagSnapshot) -> Result<ReconciliationPlan> {
    let canonical = match existing.get(&target.canonical.name) {
        None => ReconciliationEntry::Create(target.canonical.clone()),
        Some(commit) if commit == &target.canonical.commit => {
            ReconciliationEntry::Unchanged(target.canonical.clone())
        }
        Some(commit) => {
            return Err(SemrelError::TagConflict {
                tag: target.canonical.name.clone(),
                existing: commit.clone(),
                target: target.canonical.commit.clone(),
            });
        }
    };

    let convenience = target
        .convenience
        .iter()
        .map(|tag| match existing.get(&tag.name) {
            None => ReconciliationEntry::Create(tag.clone()),
            Some(commit) if commit == &tag.commit => ReconciliationEntry::Unchanged(tag.clone()),
            Some(commit) => ReconciliationEntry::Move {
                from: commit.clone(),
                to: tag.clone(),
            },
        })
        .collect();

    Ok(ReconciliationPlan {
        canonical,
        convenience,
    })
}
