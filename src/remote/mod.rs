//! Pull-based reconciliation with an authoritative peer
//!
//! A [`Replica`] sends its [`LocalMeta`] to a [`RemotePeer`], applies the
//! returned updates to a working copy, and commits only once the working
//! copy hashes to the peer's declared content hash. Leaves the peer no longer
//! lists under [`RemotePeer::ids`] are pruned before giving up.

mod config;
#[cfg(feature = "sync")]
mod http;
mod source;
mod sync;

pub use config::{Auth, SyncConfig, DEFAULT_API_URL};
#[cfg(feature = "sync")]
pub use http::HttpPeer;
pub use source::TreeSource;
pub use sync::{PullResult, Replica, ReplicaState};

use crate::model::{EntryMode, Hash};
use crate::Result;
use serde::{Deserialize, Serialize};

/// What a replica reports about itself when asking for updates
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMeta {
    pub content_hash: Hash,
    /// Newest modification stamp already applied, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<u64>,
}

fn is_default_mode(mode: &EntryMode) -> bool {
    *mode == EntryMode::File
}

/// One leaf the peer changed since the replica's stamp
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntry {
    pub path: String,
    pub sha: Hash,
    #[serde(default, skip_serializing_if = "is_default_mode")]
    pub mode: EntryMode,
    #[serde(default)]
    pub modified_at: u64,
}

/// Peer response: the authoritative content hash plus changed leaves
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Updates {
    pub content_hash: Hash,
    #[serde(default)]
    pub entries: Vec<UpdateEntry>,
}

impl Updates {
    /// Newest stamp among the entries
    pub fn newest(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.modified_at).max()
    }
}

/// The authoritative side of a sync
pub trait RemotePeer {
    /// Leaves modified after `meta.modified_at`, and the current content hash
    fn updates(&self, meta: &LocalMeta) -> Result<Updates>;

    /// Ids (leaf paths) of every live entry
    fn ids(&self) -> Result<Vec<String>>;
}

impl<P: RemotePeer + ?Sized> RemotePeer for &P {
    fn updates(&self, meta: &LocalMeta) -> Result<Updates> {
        (**self).updates(meta)
    }

    fn ids(&self) -> Result<Vec<String>> {
        (**self).ids()
    }
}
