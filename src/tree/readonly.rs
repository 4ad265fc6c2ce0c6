//! Immutable, hash-verified tree snapshots

use super::node::{Entry, Leaf, Node};
use super::path;
use super::WriteableTree;
use crate::model::{ChangeSet, EntryType, FlatEntry, FlatTree, Hash};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A compiled tree. Cheap to clone; unchanged subtrees are shared.
#[derive(Clone, Debug)]
pub struct ReadonlyTree {
    root: Arc<Node>,
}

impl ReadonlyTree {
    /// The tree with no entries
    pub fn empty() -> Self {
        ReadonlyTree {
            root: Arc::new(Node::empty()),
        }
    }

    pub(crate) fn from_root(root: Arc<Node>) -> Self {
        ReadonlyTree { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn sha(&self) -> Hash {
        self.root.sha()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The entry at `path`, if any
    pub fn get(&self, path: &str) -> Option<&Entry> {
        let segments = path::split(path).ok()?;
        let (last, parents) = segments.split_last()?;
        let mut node: &Node = &self.root;
        for segment in parents {
            match node.get(segment)? {
                Entry::Node(child) => node = child.as_ref(),
                Entry::Leaf(_) => return None,
            }
        }
        node.get(last)
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// The leaf at `path`; fails if it is missing or a directory
    pub fn get_leaf(&self, path: &str) -> Result<Leaf> {
        path::split(path)?;
        match self.get(path) {
            Some(Entry::Leaf(leaf)) => Ok(*leaf),
            Some(Entry::Node(_)) => Err(Error::WrongKind {
                path: path.to_string(),
                expected: "leaf",
            }),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    /// The directory at `path`; fails if it is missing or a leaf
    pub fn get_node(&self, path: &str) -> Result<&Node> {
        path::split(path)?;
        match self.get(path) {
            Some(Entry::Node(node)) => Ok(node.as_ref()),
            Some(Entry::Leaf(_)) => Err(Error::WrongKind {
                path: path.to_string(),
                expected: "directory",
            }),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    /// Every path, directories and leaves, depth first in name order
    pub fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.walk().map(|(path, _)| path)
    }

    /// `(path, sha)` of every leaf
    pub fn iter(&self) -> impl Iterator<Item = (String, Hash)> + '_ {
        self.walk().filter_map(|(path, entry)| match entry {
            Entry::Leaf(leaf) => Some((path, leaf.sha)),
            Entry::Node(_) => None,
        })
    }

    /// Path → sha lookup table of every leaf
    pub fn index(&self) -> BTreeMap<String, Hash> {
        self.iter().collect()
    }

    /// Every blob and tree sha reachable from the root, the root included
    pub fn shas(&self) -> HashSet<Hash> {
        let mut shas: HashSet<Hash> = self.walk().map(|(_, entry)| entry.sha()).collect();
        shas.insert(self.sha());
        shas
    }

    /// Export as `ls-tree -r -t` style records
    pub fn flat(&self) -> FlatTree {
        let tree = self
            .walk()
            .map(|(path, entry)| match entry {
                Entry::Leaf(leaf) => FlatEntry::blob(path, leaf.sha, leaf.mode),
                Entry::Node(node) => FlatEntry::tree(path, node.sha()),
            })
            .collect();
        FlatTree {
            sha: self.sha(),
            tree,
        }
    }

    /// Rebuild from flat records, verifying every declared tree sha and the root
    pub fn from_flat(flat: &FlatTree) -> Result<Self> {
        let mut builder = WriteableTree::new();
        for record in &flat.tree {
            if record.entry_type == EntryType::Blob {
                builder.add(&record.path, record.sha, record.mode)?;
            }
        }
        let tree = builder.compile();

        for record in &flat.tree {
            if record.entry_type != EntryType::Tree {
                continue;
            }
            let actual = match tree.get(&record.path) {
                Some(entry) => entry.sha(),
                // Directories without leaves are pruned
                None => Hash::EMPTY_TREE,
            };
            if actual != record.sha {
                return Err(Error::ShaMismatch {
                    expected: record.sha,
                    actual,
                });
            }
        }

        if tree.sha() != flat.sha {
            return Err(Error::ShaMismatch {
                expected: flat.sha,
                actual: tree.sha(),
            });
        }
        Ok(tree)
    }

    /// Changes turning this tree into `other`
    pub fn diff(&self, other: &ReadonlyTree) -> ChangeSet {
        crate::ops::diff_trees(self, other)
    }

    /// The tree produced by applying `changes`, which must start from this tree
    pub fn with_changes(&self, changes: &ChangeSet) -> Result<ReadonlyTree> {
        if self.sha() != changes.from_sha {
            return Err(Error::ShaMismatch {
                expected: changes.from_sha,
                actual: self.sha(),
            });
        }
        let mut writeable = self.to_writeable();
        writeable.apply_changes(changes)?;
        Ok(writeable.compile())
    }

    pub fn to_writeable(&self) -> WriteableTree {
        WriteableTree::from_readonly(self)
    }

    /// Semantic equality: same root sha
    pub fn equals(&self, other: &ReadonlyTree) -> bool {
        self.sha() == other.sha()
    }

    fn walk(&self) -> Walk<'_> {
        let mut walk = Walk { stack: Vec::new() };
        walk.push_children("", &self.root);
        walk
    }
}

impl Default for ReadonlyTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for ReadonlyTree {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for ReadonlyTree {}

struct Walk<'a> {
    stack: Vec<(String, &'a Entry)>,
}

impl<'a> Walk<'a> {
    fn push_children(&mut self, prefix: &str, node: &'a Node) {
        let children: Vec<_> = node.entries().collect();
        for (name, entry) in children.into_iter().rev() {
            self.stack.push((path::join(prefix, name), entry));
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, entry) = self.stack.pop()?;
        if let Entry::Node(node) = entry {
            self.push_children(&path, node);
        }
        Some((path, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryMode;

    fn fixture() -> ReadonlyTree {
        let mut tree = WriteableTree::new();
        tree.add_file("file.txt", Hash::blob(b"")).unwrap();
        tree.add_file("subdir/a.txt", Hash::blob(b"a\n")).unwrap();
        tree.add("subdir/run.sh", Hash::blob(b"#!/bin/sh\n"), EntryMode::Executable)
            .unwrap();
        tree.add_file("subdir/deeper/a.txt", Hash::blob(b"a\n"))
            .unwrap();
        tree.compile()
    }

    #[test]
    fn test_lookup_kinds() {
        let tree = fixture();
        assert!(tree.has("subdir"));
        assert!(tree.has("subdir/deeper/a.txt"));
        assert!(!tree.has("subdir/a.txt/x"));
        assert!(tree.get_node("subdir/deeper").is_ok());
        assert!(matches!(
            tree.get_node("file.txt"),
            Err(Error::WrongKind { .. })
        ));
        assert!(matches!(
            tree.get_leaf("subdir"),
            Err(Error::WrongKind { .. })
        ));
        assert_eq!(
            tree.get_leaf("subdir/run.sh").unwrap().mode,
            EntryMode::Executable
        );
    }

    #[test]
    fn test_flat_roundtrip() {
        let tree = fixture();
        let flat = tree.flat();
        assert_eq!(flat.sha, tree.sha());
        assert_eq!(flat.tree.len(), 6);
        assert_eq!(flat.tree[1].path, "subdir");
        assert_eq!(flat.tree[1].entry_type, EntryType::Tree);

        let back = ReadonlyTree::from_flat(&flat).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_from_flat_rejects_wrong_root() {
        let mut flat = fixture().flat();
        flat.sha = Hash::EMPTY_TREE;
        assert!(matches!(
            ReadonlyTree::from_flat(&flat),
            Err(Error::ShaMismatch { .. })
        ));
    }

    #[test]
    fn test_from_flat_rejects_wrong_subtree() {
        let mut flat = fixture().flat();
        let record = flat
            .tree
            .iter_mut()
            .find(|r| r.path == "subdir/deeper")
            .unwrap();
        record.sha = Hash::blob(b"bogus");
        let err = ReadonlyTree::from_flat(&flat).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_shas_cover_blobs_and_trees() {
        let tree = fixture();
        let shas = tree.shas();
        assert!(shas.contains(&tree.sha()));
        assert!(shas.contains(&Hash::blob(b"a\n")));
        assert!(shas.contains(&tree.get_node("subdir").unwrap().sha()));
        // file.txt, a.txt (shared), run.sh, subdir, deeper, root
        assert_eq!(shas.len(), 6);
    }

    #[test]
    fn test_with_changes_checks_starting_sha() {
        let tree = fixture();
        let stale = ChangeSet::new(Hash::EMPTY_TREE, vec![]);
        match tree.with_changes(&stale) {
            Err(Error::ShaMismatch { expected, actual }) => {
                assert_eq!(expected, Hash::EMPTY_TREE);
                assert_eq!(actual, tree.sha());
            }
            other => panic!("expected sha mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_through_writeable() {
        let tree = fixture();
        let writeable = tree.to_writeable();
        assert_eq!(writeable.sha(), tree.sha());
        assert_eq!(writeable.index(), tree.index());
    }
}
