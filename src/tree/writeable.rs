//! Mutable tree builder
//!
//! Directories live in an arena. Each slot records its parent so mutations
//! can invalidate memoized shas and prune emptied directories; ownership
//! still runs strictly from parent to child through the `children` maps.

use super::node::{tree_sha, Entry, Leaf, Node};
use super::path;
use super::ReadonlyTree;
use crate::model::{ChangeSet, EntryMode, Hash};
use crate::{Error, Result};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

type SlotId = usize;

const ROOT: SlotId = 0;

#[derive(Clone, Debug)]
enum SlotKind {
    Leaf(Leaf),
    Dir {
        children: BTreeMap<String, SlotId>,
        sha: Cell<Option<Hash>>,
    },
}

impl SlotKind {
    fn dir() -> Self {
        SlotKind::Dir {
            children: BTreeMap::new(),
            sha: Cell::new(None),
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    parent: Option<SlotId>,
    kind: SlotKind,
}

/// A mutable, content-addressed path tree
///
/// Shas are computed lazily and memoized per directory; any mutation clears
/// the memo along the affected ancestor chain. Cloning produces a fully
/// independent copy.
#[derive(Clone, Debug)]
pub struct WriteableTree {
    slots: Vec<Option<Slot>>,
    free: Vec<SlotId>,
}

impl Default for WriteableTree {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteableTree {
    /// Create an empty tree
    pub fn new() -> Self {
        WriteableTree {
            slots: vec![Some(Slot {
                parent: None,
                kind: SlotKind::dir(),
            })],
            free: Vec::new(),
        }
    }

    /// Create a mutable copy of a compiled tree
    pub fn from_readonly(tree: &ReadonlyTree) -> Self {
        let mut writeable = Self::new();
        writeable.import_node(ROOT, tree.root());
        writeable
    }

    /// Insert or overwrite a leaf, creating intermediate directories
    pub fn add(&mut self, path: &str, sha: Hash, mode: EntryMode) -> Result<()> {
        if mode.is_tree() {
            return Err(Error::InvalidMode(format!(
                "{} is a directory mode, use add_tree for '{}'",
                mode, path
            )));
        }
        let segments = path::split(path)?;
        let (name, parents) = split_last(&segments);
        let parent = self.ensure_dir(parents);
        self.set_child(parent, name, SlotKind::Leaf(Leaf::new(sha, mode)));
        Ok(())
    }

    /// Insert or overwrite a regular file leaf
    pub fn add_file(&mut self, path: &str, sha: Hash) -> Result<()> {
        self.add(path, sha, EntryMode::File)
    }

    /// Insert or overwrite a whole subtree at `path`
    pub fn add_tree(&mut self, path: &str, subtree: &ReadonlyTree) -> Result<()> {
        let segments = path::split(path)?;
        let (name, parents) = split_last(&segments);
        let parent = self.ensure_dir(parents);
        let dir = self.set_child(parent, name, SlotKind::dir());
        self.import_node(dir, subtree.root());
        Ok(())
    }

    /// Delete a leaf or subtree, pruning ancestors left empty
    ///
    /// Removing a path that does not exist is a no-op.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let segments = path::split(path)?;
        if let Some(id) = self.lookup(&segments) {
            self.detach(id);
            self.release(id);
        }
        Ok(())
    }

    /// Move a leaf or subtree; an existing entry at `to` is overwritten
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let from_segments = path::split(from)?;
        let to_segments = path::split(to)?;
        let id = self
            .lookup(&from_segments)
            .ok_or_else(|| Error::NotFound(from.to_string()))?;
        if from == to {
            return Ok(());
        }
        if path::is_descendant(to, from) {
            return Err(Error::InvalidPath(format!(
                "cannot move '{}' into itself at '{}'",
                from, to
            )));
        }

        self.detach(id);
        let (name, parents) = split_last(&to_segments);
        let parent = self.ensure_dir(parents);
        if let Some(existing) = self.children(parent).get(name).copied() {
            self.release(existing);
        }
        self.slot_mut(id).parent = Some(parent);
        self.children_mut(parent).insert(name.to_string(), id);
        self.invalidate(parent);
        Ok(())
    }

    /// True if a leaf or directory exists at exactly `path`
    pub fn has(&self, path: &str) -> bool {
        path::split(path)
            .ok()
            .and_then(|segments| self.lookup(&segments))
            .is_some()
    }

    /// The leaf at `path`; fails if it is missing or a directory
    pub fn get_leaf(&self, path: &str) -> Result<Leaf> {
        let segments = path::split(path)?;
        let id = self
            .lookup(&segments)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        match &self.slot(id).kind {
            SlotKind::Leaf(leaf) => Ok(*leaf),
            SlotKind::Dir { .. } => Err(Error::WrongKind {
                path: path.to_string(),
                expected: "leaf",
            }),
        }
    }

    /// The directory at `path` frozen as a node; fails if it is missing or a leaf
    pub fn get_node(&self, path: &str) -> Result<Node> {
        let segments = path::split(path)?;
        let id = self
            .lookup(&segments)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        match &self.slot(id).kind {
            SlotKind::Dir { .. } => Ok(self.build_node(id)),
            SlotKind::Leaf(_) => Err(Error::WrongKind {
                path: path.to_string(),
                expected: "directory",
            }),
        }
    }

    /// True if the tree holds no leaves; empty directories don't count
    pub fn is_empty(&self) -> bool {
        self.sha() == Hash::EMPTY_TREE
    }

    /// Every known path, directories and leaves, depth first in name order
    pub fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.walk().map(|(path, _)| path)
    }

    /// `(path, sha)` of every leaf
    pub fn iter(&self) -> impl Iterator<Item = (String, Hash)> + '_ {
        self.walk().filter_map(move |(path, id)| match &self.slot(id).kind {
            SlotKind::Leaf(leaf) => Some((path, leaf.sha)),
            SlotKind::Dir { .. } => None,
        })
    }

    /// Path → sha lookup table of every leaf
    pub fn index(&self) -> BTreeMap<String, Hash> {
        self.iter().collect()
    }

    /// Root tree sha, recomputed only for directories touched since the last call
    pub fn sha(&self) -> Hash {
        self.dir_sha(ROOT)
    }

    /// Semantic equality: same root sha
    pub fn equals(&self, other: &WriteableTree) -> bool {
        self.sha() == other.sha()
    }

    /// Freeze into an immutable tree, dropping empty directories
    pub fn compile(&self) -> ReadonlyTree {
        ReadonlyTree::from_root(Arc::new(self.build_node(ROOT)))
    }

    /// Changes turning this tree into `other`
    pub fn diff(&self, other: &WriteableTree) -> ChangeSet {
        self.compile().diff(&other.compile())
    }

    /// Apply a change-set in place; nothing changes if it fails
    pub fn apply_changes(&mut self, changes: &ChangeSet) -> Result<()> {
        crate::ops::apply_changes(self, changes)
    }

    // === Internal helpers ===

    fn slot(&self, id: SlotId) -> &Slot {
        self.slots[id].as_ref().expect("live slot")
    }

    fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        self.slots[id].as_mut().expect("live slot")
    }

    fn children(&self, id: SlotId) -> &BTreeMap<String, SlotId> {
        match &self.slot(id).kind {
            SlotKind::Dir { children, .. } => children,
            SlotKind::Leaf(_) => unreachable!("slot {} is not a directory", id),
        }
    }

    fn children_mut(&mut self, id: SlotId) -> &mut BTreeMap<String, SlotId> {
        match &mut self.slot_mut(id).kind {
            SlotKind::Dir { children, .. } => children,
            SlotKind::Leaf(_) => unreachable!("slot {} is not a directory", id),
        }
    }

    fn alloc(&mut self, slot: Slot) -> SlotId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Free a slot and everything below it
    fn release(&mut self, id: SlotId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(slot) = self.slots[id].take() {
                if let SlotKind::Dir { children, .. } = slot.kind {
                    pending.extend(children.into_values());
                }
                self.free.push(id);
            }
        }
    }

    /// Clear memoized shas from `id` up to the root
    fn invalidate(&self, id: SlotId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let slot = self.slot(id);
            if let SlotKind::Dir { sha, .. } = &slot.kind {
                sha.set(None);
            }
            current = slot.parent;
        }
    }

    fn lookup(&self, segments: &[&str]) -> Option<SlotId> {
        let mut current = ROOT;
        for segment in segments {
            match &self.slot(current).kind {
                SlotKind::Dir { children, .. } => current = *children.get(*segment)?,
                SlotKind::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    /// Walk to the directory at `segments`, creating directories as needed and
    /// replacing leaves that stand in the way
    fn ensure_dir(&mut self, segments: &[&str]) -> SlotId {
        let mut current = ROOT;
        for segment in segments {
            let existing = self.children(current).get(*segment).copied();
            current = match existing {
                Some(id) if matches!(self.slot(id).kind, SlotKind::Dir { .. }) => id,
                _ => self.set_child(current, segment, SlotKind::dir()),
            };
        }
        current
    }

    /// Put a new slot under `parent`, releasing whatever held `name` before
    fn set_child(&mut self, parent: SlotId, name: &str, kind: SlotKind) -> SlotId {
        if let Some(existing) = self.children(parent).get(name).copied() {
            self.release(existing);
        }
        let id = self.alloc(Slot {
            parent: Some(parent),
            kind,
        });
        self.children_mut(parent).insert(name.to_string(), id);
        self.invalidate(parent);
        id
    }

    /// Unlink `id` from its parent and prune directories that become empty.
    /// The slot itself stays allocated.
    fn detach(&mut self, id: SlotId) {
        let mut child = id;
        while let Some(parent) = self.slot(child).parent {
            self.children_mut(parent).retain(|_, slot| *slot != child);
            self.invalidate(parent);
            if child != id {
                self.release(child);
            }
            if parent == ROOT || !self.children(parent).is_empty() {
                break;
            }
            child = parent;
        }
    }

    fn import_node(&mut self, dir: SlotId, node: &Node) {
        for (name, entry) in node.entries() {
            match entry {
                Entry::Leaf(leaf) => {
                    self.set_child(dir, name, SlotKind::Leaf(*leaf));
                }
                Entry::Node(child) => {
                    let id = self.set_child(dir, name, SlotKind::dir());
                    self.import_node(id, child);
                }
            }
        }
    }

    fn dir_sha(&self, id: SlotId) -> Hash {
        let (children, memo) = match &self.slot(id).kind {
            SlotKind::Dir { children, sha } => (children, sha),
            SlotKind::Leaf(leaf) => return leaf.sha,
        };
        if let Some(sha) = memo.get() {
            return sha;
        }
        let mut entries = Vec::with_capacity(children.len());
        for (name, &child) in children {
            match &self.slot(child).kind {
                SlotKind::Leaf(leaf) => entries.push((name.as_str(), leaf.mode, leaf.sha)),
                SlotKind::Dir { .. } => {
                    let sha = self.dir_sha(child);
                    // Directories without leaves do not exist in Git
                    if sha != Hash::EMPTY_TREE {
                        entries.push((name.as_str(), EntryMode::Tree, sha));
                    }
                }
            }
        }
        let sha = tree_sha(entries);
        memo.set(Some(sha));
        sha
    }

    fn build_node(&self, id: SlotId) -> Node {
        let mut entries = BTreeMap::new();
        for (name, &child) in self.children(id) {
            let entry = match &self.slot(child).kind {
                SlotKind::Leaf(leaf) => Entry::Leaf(*leaf),
                SlotKind::Dir { .. } => Entry::Node(Arc::new(self.build_node(child))),
            };
            entries.insert(name.clone(), entry);
        }
        Node::new(entries)
    }

    fn walk(&self) -> Walk<'_> {
        let mut walk = Walk {
            tree: self,
            stack: Vec::new(),
        };
        walk.push_children("", ROOT);
        walk
    }
}

/// Depth-first traversal yielding `(path, slot)` in name order
struct Walk<'a> {
    tree: &'a WriteableTree,
    stack: Vec<(String, SlotId)>,
}

impl Walk<'_> {
    fn push_children(&mut self, prefix: &str, dir: SlotId) {
        let tree = self.tree;
        for (name, &id) in tree.children(dir).iter().rev() {
            self.stack.push((path::join(prefix, name), id));
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = (String, SlotId);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, id) = self.stack.pop()?;
        if matches!(self.tree.slot(id).kind, SlotKind::Dir { .. }) {
            self.push_children(&path, id);
        }
        Some((path, id))
    }
}

fn split_last<'s, 'a>(segments: &'s [&'a str]) -> (&'a str, &'s [&'a str]) {
    let (last, parents) = segments
        .split_last()
        .expect("path::split never returns an empty list");
    (*last, parents)
}
