//! # treesync
//!
//! Git-compatible content-addressed trees, a Git delta codec, and a
//! pull-based protocol for keeping replicas of a tree in sync.
//!
//! ## Core Concepts
//!
//! - **Trees**: path → blob-sha maps whose directory ids match Git's tree ids
//! - **Change-sets**: the minimal adds and deletes turning one tree into another
//! - **Deltas**: Git's copy/insert binary diff format for blob content
//! - **Replicas**: local copies that converge on an authoritative peer's hash
//!
//! ## Example
//!
//! ```
//! use treesync::{Hash, WriteableTree};
//!
//! let mut tree = WriteableTree::new();
//! tree.add_file("docs/readme.md", Hash::blob(b"hello\n"))?;
//! let snapshot = tree.compile();
//! assert!(snapshot.has("docs"));
//! # Ok::<(), treesync::Error>(())
//! ```

pub mod delta;
pub mod logging;
pub mod model;
pub mod ops;
pub mod remote;
pub mod store;
pub mod tree;

mod error;

pub use error::{Error, Result};
pub use logging::{init_logging, LoggingConfig};
pub use model::{
    Change, ChangeOp, ChangeSet, EntryMode, EntryType, FlatEntry, FlatTree, Hash, ObjectKind,
};
#[cfg(feature = "sync")]
pub use remote::HttpPeer;
pub use remote::{
    Auth, LocalMeta, PullResult, RemotePeer, Replica, ReplicaState, SyncConfig, TreeSource,
    UpdateEntry, Updates, DEFAULT_API_URL,
};
pub use store::{missing_blobs, BlobStore, MemoryStore};
pub use tree::{Entry, Leaf, Node, ReadonlyTree, WriteableTree};
