//! Applying change-sets to a mutable tree

use crate::model::{ChangeOp, ChangeSet};
use crate::tree::WriteableTree;
use crate::{Error, Result};

/// Apply `changes` to `tree` in list order
///
/// The tree must currently hash to `changes.from_sha`. Work happens on a
/// copy, so on any error `tree` is left exactly as it was.
pub fn apply_changes(tree: &mut WriteableTree, changes: &ChangeSet) -> Result<()> {
    let actual = tree.sha();
    if actual != changes.from_sha {
        return Err(Error::ShaMismatch {
            expected: changes.from_sha,
            actual,
        });
    }

    let mut work = tree.clone();
    for change in &changes.changes {
        match change.op {
            ChangeOp::Delete => work.remove(&change.path)?,
            ChangeOp::Add => work.add(&change.path, change.sha, change.mode)?,
        }
    }

    *tree = work;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Change, EntryMode, Hash};

    fn sample() -> WriteableTree {
        let mut tree = WriteableTree::new();
        tree.add_file("docs/readme.md", Hash::blob(b"readme")).unwrap();
        tree.add_file("src/lib.rs", Hash::blob(b"lib")).unwrap();
        tree
    }

    #[test]
    fn test_apply_diff_reaches_target() {
        let mut from = sample();
        let mut to = sample();
        to.remove("docs/readme.md").unwrap();
        to.add("bin/run", Hash::blob(b"run"), EntryMode::Executable)
            .unwrap();
        to.add_file("src/lib.rs", Hash::blob(b"lib v2")).unwrap();

        let changes = from.diff(&to);
        apply_changes(&mut from, &changes).unwrap();
        assert_eq!(from.sha(), to.sha());
        assert!(!from.has("docs"));
    }

    #[test]
    fn test_apply_rejects_stale_base() {
        let mut tree = sample();
        let before = tree.sha();
        let changes = ChangeSet::new(
            Hash::EMPTY_TREE,
            vec![Change::add("x", Hash::blob(b"x"), EntryMode::File)],
        );

        match apply_changes(&mut tree, &changes) {
            Err(Error::ShaMismatch { expected, actual }) => {
                assert_eq!(expected, Hash::EMPTY_TREE);
                assert_eq!(actual, before);
            }
            other => panic!("expected sha mismatch, got {:?}", other),
        }
        assert!(!tree.has("x"));
    }

    #[test]
    fn test_failed_apply_leaves_tree_untouched() {
        let mut tree = sample();
        let before = tree.sha();
        let changes = ChangeSet::new(
            before,
            vec![
                Change::add("new.txt", Hash::blob(b"new"), EntryMode::File),
                Change::add("bad//path", Hash::blob(b"bad"), EntryMode::File),
            ],
        );

        let err = apply_changes(&mut tree, &changes).unwrap_err();
        assert!(err.is_structural());
        assert_eq!(tree.sha(), before);
        assert!(!tree.has("new.txt"));
    }

    #[test]
    fn test_changes_apply_in_order() {
        let mut tree = sample();
        let changes = ChangeSet::new(
            tree.sha(),
            vec![
                Change::add("a.txt", Hash::blob(b"one"), EntryMode::File),
                Change::delete("a.txt", Hash::blob(b"one")),
                Change::add("a.txt", Hash::blob(b"two"), EntryMode::File),
            ],
        );
        apply_changes(&mut tree, &changes).unwrap();
        assert_eq!(tree.get_leaf("a.txt").unwrap().sha, Hash::blob(b"two"));
    }

    #[test]
    fn test_empty_change_set_is_identity() {
        let mut tree = sample();
        let before = tree.sha();
        apply_changes(&mut tree, &ChangeSet::new(before, Vec::new())).unwrap();
        assert_eq!(tree.sha(), before);
    }
}
