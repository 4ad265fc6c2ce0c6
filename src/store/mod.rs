//! Blob storage consumed by trees and sync
//!
//! Trees only hold blob shas. Content lives behind [`BlobStore`], keyed by
//! the Git blob id of the bytes.

mod memory;

pub use memory::MemoryStore;

use crate::model::Hash;
use crate::tree::ReadonlyTree;
use crate::Result;
use bytes::Bytes;
use std::collections::BTreeSet;

/// Read access to content-addressed blobs
pub trait BlobStore {
    /// Content of the blob with id `sha`; `Error::NotFound` if absent
    fn get_blob(&self, sha: &Hash) -> Result<Bytes>;

    /// True if the blob with id `sha` is stored
    fn has_sha(&self, sha: &Hash) -> bool;
}

/// Leaf shas of `tree` that `store` does not hold, deduplicated and sorted
pub fn missing_blobs<S: BlobStore + ?Sized>(tree: &ReadonlyTree, store: &S) -> Vec<Hash> {
    let wanted: BTreeSet<Hash> = tree.iter().map(|(_, sha)| sha).collect();
    wanted
        .into_iter()
        .filter(|sha| !store.has_sha(sha))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WriteableTree;

    #[test]
    fn test_missing_blobs() {
        let store = MemoryStore::new();
        let present = store.put(&b"present"[..]);

        let mut tree = WriteableTree::new();
        tree.add_file("a.txt", present).unwrap();
        tree.add_file("b.txt", Hash::blob(b"absent")).unwrap();
        tree.add_file("copy/b.txt", Hash::blob(b"absent")).unwrap();

        let missing = missing_blobs(&tree.compile(), &store);
        assert_eq!(missing, vec![Hash::blob(b"absent")]);
    }

    #[test]
    fn test_missing_blobs_empty_tree() {
        let store = MemoryStore::new();
        assert!(missing_blobs(&ReadonlyTree::empty(), &store).is_empty());
    }
}
