//! In-memory blob store

use super::BlobStore;
use crate::delta;
use crate::model::Hash;
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A thread-safe map from Git blob id to content
///
/// Readers proceed concurrently; writers are serialized by the lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<Hash, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` and return its blob id. Storing the same bytes twice is a no-op.
    pub fn put(&self, data: impl Into<Bytes>) -> Hash {
        let data = data.into();
        let sha = Hash::blob(&data);
        let mut blobs = self.blobs.write();
        if !blobs.contains_key(&sha) {
            debug!(sha = %sha.short(), size = data.len(), "stored blob");
            blobs.insert(sha, data);
        }
        sha
    }

    /// Reconstruct a blob from `delta` against the stored blob `base_sha`
    ///
    /// If `expected` is given, the reconstructed content must hash to it.
    pub fn put_delta(&self, base_sha: &Hash, delta: &[u8], expected: Option<Hash>) -> Result<Hash> {
        let base = self.get_blob(base_sha)?;
        let target = delta::apply(&base, delta)?;
        let sha = Hash::blob(&target);
        if let Some(expected) = expected {
            if sha != expected {
                warn!(expected = %expected, actual = %sha, "delta produced unexpected blob");
                return Err(Error::ShaMismatch {
                    expected,
                    actual: sha,
                });
            }
        }
        debug!(
            base = %base_sha.short(),
            delta_len = delta.len(),
            size = target.len(),
            "reconstructed blob from delta"
        );
        Ok(self.put(target))
    }

    /// Encode `target` as a delta against the stored blob `base_sha`
    pub fn delta_against(&self, base_sha: &Hash, target: &[u8]) -> Result<Vec<u8>> {
        let base = self.get_blob(base_sha)?;
        Ok(delta::create(&base, target))
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryStore {
    fn get_blob(&self, sha: &Hash) -> Result<Bytes> {
        self.blobs
            .read()
            .get(sha)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("blob {}", sha)))
    }

    fn has_sha(&self, sha: &Hash) -> bool {
        self.blobs.read().contains_key(sha)
    }
}
