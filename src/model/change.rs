//! Change-sets: the minimal transform from one tree to another

use crate::model::{EntryMode, Hash};
use serde::{Deserialize, Serialize};

/// Kind of a single change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Add,
    Delete,
}

fn is_default_mode(mode: &EntryMode) -> bool {
    *mode == EntryMode::File
}

/// A single leaf-level change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub op: ChangeOp,
    pub path: String,
    pub sha: Hash,
    #[serde(default, skip_serializing_if = "is_default_mode")]
    pub mode: EntryMode,
}

impl Change {
    pub fn add(path: impl Into<String>, sha: Hash, mode: EntryMode) -> Self {
        Change {
            op: ChangeOp::Add,
            path: path.into(),
            sha,
            mode,
        }
    }

    pub fn delete(path: impl Into<String>, sha: Hash) -> Self {
        Change {
            op: ChangeOp::Delete,
            path: path.into(),
            sha,
            mode: EntryMode::File,
        }
    }
}

/// Ordered changes plus the sha of the tree they apply to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub from_sha: Hash,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(from_sha: Hash, changes: Vec<Change>) -> Self {
        ChangeSet { from_sha, changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn added_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.op == ChangeOp::Add)
            .count()
    }

    pub fn removed_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| c.op == ChangeOp::Delete)
            .count()
    }
}
