//! Replica side of the pull protocol

use super::{LocalMeta, RemotePeer};
use crate::model::{FlatTree, Hash};
use crate::tree::ReadonlyTree;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of a successful pull
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PullResult {
    /// The peer declared the hash we already have
    AlreadyUpToDate,
    /// Applying the updates was enough to converge
    Updated { applied: usize, content_hash: Hash },
    /// Converged after dropping leaves the peer no longer lists
    Pruned {
        applied: usize,
        removed: usize,
        content_hash: Hash,
    },
}

impl PullResult {
    pub fn changed(&self) -> bool {
        !matches!(self, PullResult::AlreadyUpToDate)
    }
}

/// A local copy of the peer's tree
#[derive(Clone, Debug, Default)]
pub struct Replica {
    tree: ReadonlyTree,
    modified_at: Option<u64>,
}

impl Replica {
    /// An empty replica that has seen nothing
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: ReadonlyTree, modified_at: Option<u64>) -> Self {
        Replica { tree, modified_at }
    }

    pub fn tree(&self) -> &ReadonlyTree {
        &self.tree
    }

    pub fn modified_at(&self) -> Option<u64> {
        self.modified_at
    }

    pub fn meta(&self) -> LocalMeta {
        LocalMeta {
            content_hash: self.tree.sha(),
            modified_at: self.modified_at,
        }
    }

    /// Reconcile with `peer`
    ///
    /// Nothing is modified unless the pull converges. On
    /// [`Error::SyncAbandoned`] the replica is exactly as before, and the
    /// caller should fall back to fetching the full tree.
    pub fn pull<P: RemotePeer + ?Sized>(&mut self, peer: &P) -> Result<PullResult> {
        let meta = self.meta();
        let updates = peer.updates(&meta)?;
        let expected = updates.content_hash;

        if expected == meta.content_hash {
            debug!(sha = %expected.short(), "replica already up to date");
            return Ok(PullResult::AlreadyUpToDate);
        }

        let mut work = self.tree.to_writeable();
        for entry in &updates.entries {
            work.add(&entry.path, entry.sha, entry.mode)?;
        }
        let applied = updates.entries.len();
        let modified_at = self.modified_at.max(updates.newest());
        debug!(
            applied,
            local = %work.sha().short(),
            remote = %expected.short(),
            "applied updates"
        );

        if work.sha() == expected {
            self.tree = work.compile();
            self.modified_at = modified_at;
            info!(applied, sha = %expected.short(), "replica updated");
            return Ok(PullResult::Updated {
                applied,
                content_hash: expected,
            });
        }

        // Hashes still differ: something was deleted upstream
        let live: HashSet<String> = peer.ids()?.into_iter().collect();
        let stale: Vec<String> = work
            .iter()
            .map(|(path, _)| path)
            .filter(|path| !live.contains(path))
            .collect();
        for path in &stale {
            work.remove(path)?;
        }
        let actual = work.sha();

        if actual == expected {
            self.tree = work.compile();
            self.modified_at = modified_at;
            info!(
                applied,
                removed = stale.len(),
                sha = %expected.short(),
                "replica updated after pruning"
            );
            return Ok(PullResult::Pruned {
                applied,
                removed: stale.len(),
                content_hash: expected,
            });
        }

        warn!(
            expected = %expected,
            actual = %actual,
            "replica could not converge, abandoning sync"
        );
        Err(Error::SyncAbandoned { expected, actual })
    }

    /// Serializable snapshot of the replica
    pub fn state(&self) -> ReplicaState {
        ReplicaState {
            modified_at: self.modified_at,
            tree: self.tree.flat(),
        }
    }

    /// Restore from a snapshot, verifying every tree sha it declares
    pub fn from_state(state: &ReplicaState) -> Result<Self> {
        Ok(Replica {
            tree: ReadonlyTree::from_flat(&state.tree)?,
            modified_at: state.modified_at,
        })
    }
}

/// Persisted replica: the flat tree plus the newest stamp seen
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<u64>,
    #[serde(flatten)]
    pub tree: FlatTree,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryMode;
    use crate::remote::{TreeSource, Updates};

    /// Declares a content hash no set of updates can reach
    struct LyingPeer {
        inner: TreeSource,
    }

    impl RemotePeer for LyingPeer {
        fn updates(&self, meta: &LocalMeta) -> Result<Updates> {
            let mut updates = self.inner.updates(meta)?;
            updates.content_hash = Hash::blob(b"not a tree");
            Ok(updates)
        }

        fn ids(&self) -> Result<Vec<String>> {
            self.inner.ids()
        }
    }

    #[test]
    fn test_pull_into_empty_replica() {
        let mut source = TreeSource::new();
        source.put("a.txt", Hash::blob(b"a"), EntryMode::File).unwrap();
        source.put("dir/b.txt", Hash::blob(b"b"), EntryMode::File).unwrap();

        let mut replica = Replica::new();
        let result = replica.pull(&source).unwrap();
        assert_eq!(
            result,
            PullResult::Updated {
                applied: 2,
                content_hash: source.content_hash(),
            }
        );
        assert_eq!(replica.tree().sha(), source.content_hash());
        assert_eq!(replica.modified_at(), Some(2));
    }

    #[test]
    fn test_pull_twice_is_up_to_date() {
        let mut source = TreeSource::new();
        source.put("a.txt", Hash::blob(b"a"), EntryMode::File).unwrap();

        let mut replica = Replica::new();
        replica.pull(&source).unwrap();
        let result = replica.pull(&source).unwrap();
        assert_eq!(result, PullResult::AlreadyUpToDate);
        assert!(!result.changed());
    }

    #[test]
    fn test_pull_prunes_deleted_leaves() {
        let mut source = TreeSource::new();
        source.put("keep.txt", Hash::blob(b"keep"), EntryMode::File).unwrap();
        source.put("gone/x.txt", Hash::blob(b"x"), EntryMode::File).unwrap();

        let mut replica = Replica::new();
        replica.pull(&source).unwrap();

        source.remove("gone/x.txt").unwrap();
        let result = replica.pull(&source).unwrap();
        assert!(matches!(result, PullResult::Pruned { removed: 1, .. }));
        assert!(!replica.tree().has("gone"));
        assert_eq!(replica.tree().sha(), source.content_hash());
    }

    #[test]
    fn test_abandoned_pull_leaves_replica_untouched() {
        let mut inner = TreeSource::new();
        inner.put("a.txt", Hash::blob(b"a"), EntryMode::File).unwrap();
        let peer = LyingPeer { inner };

        let mut replica = Replica::new();
        let err = replica.pull(&peer).unwrap_err();
        assert!(matches!(err, Error::SyncAbandoned { .. }));
        assert!(err.is_recoverable());
        assert!(replica.tree().is_empty());
        assert_eq!(replica.modified_at(), None);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut source = TreeSource::new();
        source.put("a/b/c.txt", Hash::blob(b"c"), EntryMode::File).unwrap();
        let mut replica = Replica::new();
        replica.pull(&source).unwrap();

        let json = serde_json::to_string(&replica.state()).unwrap();
        let state: ReplicaState = serde_json::from_str(&json).unwrap();
        let restored = Replica::from_state(&state).unwrap();
        assert_eq!(restored.tree(), replica.tree());
        assert_eq!(restored.modified_at(), replica.modified_at());
    }
}
