//! In-process authoritative peer

use super::{LocalMeta, RemotePeer, UpdateEntry, Updates};
use crate::model::{EntryMode, Hash};
use crate::tree::{path, ReadonlyTree, WriteableTree};
use crate::Result;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug)]
struct Stamped {
    sha: Hash,
    mode: EntryMode,
    modified_at: u64,
}

/// A tree that answers pulls, stamping every write with a logical clock
///
/// Deletions carry no stamp: replicas learn about them through
/// [`RemotePeer::ids`].
#[derive(Clone, Debug, Default)]
pub struct TreeSource {
    tree: WriteableTree,
    leaves: BTreeMap<String, Stamped>,
    clock: u64,
}

impl TreeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a leaf and return its stamp
    ///
    /// A leaf that was an ancestor of `path`, or entries below `path`, are
    /// replaced just as in [`WriteableTree::add`].
    pub fn put(&mut self, path: &str, sha: Hash, mode: EntryMode) -> Result<u64> {
        self.tree.add(path, sha, mode)?;

        let mut ancestor = String::new();
        for segment in path::split(path)? {
            if !ancestor.is_empty() {
                self.leaves.remove(&ancestor);
            }
            ancestor = path::join(&ancestor, segment);
        }
        self.leaves.retain(|p, _| !path::is_descendant(p, path));

        self.clock += 1;
        self.leaves.insert(
            path.to_string(),
            Stamped {
                sha,
                mode,
                modified_at: self.clock,
            },
        );
        Ok(self.clock)
    }

    /// Delete a leaf or a whole directory; returns whether anything was removed
    pub fn remove(&mut self, path: &str) -> Result<bool> {
        path::split(path)?;
        if !self.tree.has(path) {
            return Ok(false);
        }
        self.tree.remove(path)?;
        self.leaves
            .retain(|p, _| p != path && !path::is_descendant(p, path));
        debug!(path, "removed");
        Ok(true)
    }

    pub fn content_hash(&self) -> Hash {
        self.tree.sha()
    }

    pub fn snapshot(&self) -> ReadonlyTree {
        self.tree.compile()
    }

    /// Stamp of the most recent write
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

impl RemotePeer for TreeSource {
    fn updates(&self, meta: &LocalMeta) -> Result<Updates> {
        let since = meta.modified_at.unwrap_or(0);
        let entries: Vec<UpdateEntry> = self
            .leaves
            .iter()
            .filter(|(_, leaf)| leaf.modified_at > since)
            .map(|(path, leaf)| UpdateEntry {
                path: path.clone(),
                sha: leaf.sha,
                mode: leaf.mode,
                modified_at: leaf.modified_at,
            })
            .collect();
        debug!(since, count = entries.len(), "serving updates");
        Ok(Updates {
            content_hash: self.content_hash(),
            entries,
        })
    }

    fn ids(&self) -> Result<Vec<String>> {
        Ok(self.leaves.keys().cloned().collect())
    }
}
