//! Git-compatible Merkle trees over slash-separated paths
//!
//! This implements a content-addressed tree where:
//! - Leaves point at blobs by sha and never hold content
//! - Each directory's sha is the Git tree id of its sorted entries
//! - Directories without leaves do not exist, as in Git
//!
//! [`WriteableTree`] is the mutable builder used inside one edit transaction;
//! [`ReadonlyTree`] is the compiled, shareable snapshot.

pub mod path;

mod node;
mod readonly;
mod writeable;

pub use node::{serialize_entries, tree_sha, Entry, Leaf, Node};
pub use readonly::ReadonlyTree;
pub use writeable::WriteableTree;
