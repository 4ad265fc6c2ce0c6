//! Immutable tree nodes and the canonical Git tree encoding

use crate::model::{EntryMode, Hash, ObjectKind};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A pointer to blob content
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub mode: EntryMode,
    pub sha: Hash,
}

impl Leaf {
    pub fn new(sha: Hash, mode: EntryMode) -> Self {
        Leaf { mode, sha }
    }
}

/// A child of a directory: either a blob pointer or a subdirectory
#[derive(Clone, Debug)]
pub enum Entry {
    Leaf(Leaf),
    Node(Arc<Node>),
}

impl Entry {
    pub fn sha(&self) -> Hash {
        match self {
            Entry::Leaf(leaf) => leaf.sha,
            Entry::Node(node) => node.sha(),
        }
    }

    pub fn mode(&self) -> EntryMode {
        match self {
            Entry::Leaf(leaf) => leaf.mode,
            Entry::Node(_) => EntryMode::Tree,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Entry::Leaf(_))
    }
}

/// An immutable directory; its sha is computed once at construction
#[derive(Debug)]
pub struct Node {
    entries: BTreeMap<String, Entry>,
    sha: Hash,
}

impl Node {
    /// Build a node, dropping subdirectories that hold no leaves
    pub fn new(mut entries: BTreeMap<String, Entry>) -> Self {
        entries.retain(|_, entry| match entry {
            Entry::Leaf(_) => true,
            Entry::Node(node) => !node.is_empty(),
        });
        let sha = tree_sha(
            entries
                .iter()
                .map(|(name, entry)| (name.as_str(), entry.mode(), entry.sha())),
        );
        Node { entries, sha }
    }

    pub fn empty() -> Self {
        Node {
            entries: BTreeMap::new(),
            sha: Hash::EMPTY_TREE,
        }
    }

    pub fn sha(&self) -> Hash {
        self.sha
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Entries in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Git's entry order: byte order of names, with directories compared as if
/// their name ended in `/`
fn git_order(a: (&str, EntryMode), b: (&str, EntryMode)) -> Ordering {
    let suffix = |mode: EntryMode| if mode.is_tree() { Some(b'/') } else { None };
    a.0.bytes()
        .chain(suffix(a.1))
        .cmp(b.0.bytes().chain(suffix(b.1)))
}

/// Serialize directory entries into the body of a Git tree object
///
/// Each entry is `mode SP name NUL raw-sha`, entries in Git order. The input
/// may be in any order.
pub fn serialize_entries<'a>(
    entries: impl IntoIterator<Item = (&'a str, EntryMode, Hash)>,
) -> Vec<u8> {
    let mut sorted: Vec<(&str, EntryMode, Hash)> = entries.into_iter().collect();
    sorted.sort_by(|a, b| git_order((a.0, a.1), (b.0, b.1)));

    let mut out = Vec::with_capacity(sorted.len() * 48);
    for (name, mode, sha) in sorted {
        out.extend_from_slice(mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(sha.as_bytes());
    }
    out
}

/// Object id of the tree object holding `entries`
pub fn tree_sha<'a>(entries: impl IntoIterator<Item = (&'a str, EntryMode, Hash)>) -> Hash {
    Hash::object(ObjectKind::Tree, &serialize_entries(entries))
}
