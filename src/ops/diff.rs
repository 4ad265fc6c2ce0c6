//! Diff between two tree states

use crate::model::{Change, ChangeSet, EntryMode, Hash};
use crate::tree::{path, Entry, Node, ReadonlyTree};

/// Compute the change-set turning `from` into `to`
///
/// Subtrees with equal shas are skipped without descending. A changed leaf
/// yields a delete of its old sha and an add of the new one. Deletes come
/// first, then adds, each in path order, so a leaf replaced by a directory
/// (or the reverse) applies cleanly.
pub fn diff_trees(from: &ReadonlyTree, to: &ReadonlyTree) -> ChangeSet {
    let mut deletes = Vec::new();
    let mut adds = Vec::new();
    diff_nodes("", from.root(), to.root(), &mut deletes, &mut adds);

    deletes.sort_by(|a: &Change, b: &Change| a.path.cmp(&b.path));
    adds.sort_by(|a: &Change, b: &Change| a.path.cmp(&b.path));
    deletes.extend(adds);

    ChangeSet::new(from.sha(), deletes)
}

fn diff_nodes(
    prefix: &str,
    old: &Node,
    new: &Node,
    deletes: &mut Vec<Change>,
    adds: &mut Vec<Change>,
) {
    if old.sha() == new.sha() {
        return;
    }

    for (name, old_entry) in old.entries() {
        let path = path::join(prefix, name);
        match (old_entry, new.get(name)) {
            (_, None) => collect_leaves(&path, old_entry, &mut |path, leaf_sha, _| {
                deletes.push(Change::delete(path, leaf_sha))
            }),
            (Entry::Leaf(old_leaf), Some(Entry::Leaf(new_leaf))) => {
                if old_leaf != new_leaf {
                    deletes.push(Change::delete(path.clone(), old_leaf.sha));
                    adds.push(Change::add(path, new_leaf.sha, new_leaf.mode));
                }
            }
            (Entry::Node(old_node), Some(Entry::Node(new_node))) => {
                diff_nodes(&path, old_node, new_node, deletes, adds);
            }
            (_, Some(new_entry)) => {
                // Kind changed: drop everything old, add everything new
                collect_leaves(&path, old_entry, &mut |path, leaf_sha, _| {
                    deletes.push(Change::delete(path, leaf_sha))
                });
                collect_leaves(&path, new_entry, &mut |path, leaf_sha, mode| {
                    adds.push(Change::add(path, leaf_sha, mode))
                });
            }
        }
    }

    for (name, new_entry) in new.entries() {
        if old.get(name).is_none() {
            let path = path::join(prefix, name);
            collect_leaves(&path, new_entry, &mut |path, leaf_sha, mode| {
                adds.push(Change::add(path, leaf_sha, mode))
            });
        }
    }
}

fn collect_leaves(
    path: &str,
    entry: &Entry,
    visit: &mut dyn FnMut(String, Hash, EntryMode),
) {
    match entry {
        Entry::Leaf(leaf) => visit(path.to_string(), leaf.sha, leaf.mode),
        Entry::Node(node) => {
            for (name, child) in node.entries() {
                collect_leaves(&path::join(path, name), child, visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeOp;
    use crate::tree::WriteableTree;

    fn tree(entries: &[(&str, &str)]) -> ReadonlyTree {
        let mut tree = WriteableTree::new();
        for (path, content) in entries {
            tree.add_file(path, Hash::blob(content.as_bytes())).unwrap();
        }
        tree.compile()
    }

    #[test]
    fn test_diff_empty_to_non_empty() {
        let from = ReadonlyTree::empty();
        let to = tree(&[("a.txt", "a"), ("dir/b.txt", "")]);

        let diff = diff_trees(&from, &to);
        assert_eq!(diff.from_sha, Hash::EMPTY_TREE);
        assert_eq!(diff.added_count(), 2);
        assert_eq!(diff.removed_count(), 0);
    }

    #[test]
    fn test_diff_modification_deletes_old_and_adds_new() {
        let from = tree(&[("a.txt", "hello"), ("b.txt", "same")]);
        let to = tree(&[("a.txt", "hello, world"), ("b.txt", "same")]);

        let diff = diff_trees(&from, &to);
        assert_eq!(
            diff.changes,
            vec![
                Change::delete("a.txt", Hash::blob(b"hello")),
                Change::add("a.txt", Hash::blob(b"hello, world"), EntryMode::File),
            ]
        );
        assert_eq!(diff.removed_count(), 1);
        assert_eq!(diff.added_count(), 1);
        assert_eq!(from.with_changes(&diff).unwrap(), to);
    }

    #[test]
    fn test_diff_same_trees() {
        let a = tree(&[("x/y/z", "1")]);
        let diff = diff_trees(&a, &a.clone());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_skips_equal_subtrees() {
        let shared: Vec<(String, Vec<u8>)> = (0..50)
            .map(|i| (format!("shared/{}.txt", i), vec![i as u8]))
            .collect();
        let mut from = WriteableTree::new();
        let mut to = WriteableTree::new();
        for (path, content) in &shared {
            from.add_file(path, Hash::blob(content)).unwrap();
            to.add_file(path, Hash::blob(content)).unwrap();
        }
        to.add_file("new.txt", Hash::blob(b"new")).unwrap();

        let diff = from.diff(&to);
        assert_eq!(
            diff.changes,
            vec![Change::add("new.txt", Hash::blob(b"new"), EntryMode::File)]
        );
    }

    #[test]
    fn test_diff_leaf_replaced_by_directory() {
        let from = tree(&[("a", "file"), ("keep", "k")]);
        let to = tree(&[("a/inner", "nested"), ("keep", "k")]);

        let diff = diff_trees(&from, &to);
        assert_eq!(
            diff.changes,
            vec![
                Change::delete("a", Hash::blob(b"file")),
                Change::add("a/inner", Hash::blob(b"nested"), EntryMode::File),
            ]
        );
        assert_eq!(from.with_changes(&diff).unwrap(), to);
        assert_eq!(to.with_changes(&to.diff(&from)).unwrap(), from);
    }

    #[test]
    fn test_diff_mode_change() {
        let from = tree(&[("run.sh", "#!")]);
        let mut to = from.to_writeable();
        to.add("run.sh", Hash::blob(b"#!"), EntryMode::Executable)
            .unwrap();
        let to = to.compile();

        let diff = diff_trees(&from, &to);
        assert_eq!(diff.changes.len(), 2);
        assert_eq!(diff.changes[0].op, ChangeOp::Delete);
        assert_eq!(diff.changes[1].op, ChangeOp::Add);
        assert_eq!(diff.changes[1].mode, EntryMode::Executable);
        assert_eq!(from.with_changes(&diff).unwrap(), to);
    }
}
