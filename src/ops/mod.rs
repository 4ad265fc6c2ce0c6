//! Tree-to-tree operations: diff and patch

mod diff;
mod patch;

pub use diff::diff_trees;
pub use patch::apply_changes;
