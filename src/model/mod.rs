//! Core data model types for treesync

mod change;
mod entry;
mod hash;

pub use change::{Change, ChangeOp, ChangeSet};
pub use entry::{EntryMode, EntryType, FlatEntry, FlatTree};
pub use hash::{Hash, ObjectKind, HASH_SIZE};
