//! Error types for treesync

use crate::model::Hash;
use thiserror::Error;

/// Result type alias for treesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in treesync operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Expected {expected} at '{path}'")]
    WrongKind { path: String, expected: &'static str },

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid entry mode: {0}")]
    InvalidMode(String),

    #[error("Sha mismatch: expected {expected}, found {actual}")]
    ShaMismatch { expected: Hash, actual: Hash },

    #[error("Corrupt delta: {0}")]
    CorruptDelta(String),

    #[error("Sync abandoned: remote declared {expected}, local converged to {actual}")]
    SyncAbandoned { expected: Hash, actual: Hash },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Misuse of the tree API: never worth retrying
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::InvalidPath(_) | Error::WrongKind { .. })
    }

    /// Failures a caller recovers from by re-fetching the full state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ShaMismatch { .. } | Error::SyncAbandoned { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let structural = Error::WrongKind {
            path: "a/b".into(),
            expected: "leaf",
        };
        assert!(structural.is_structural());
        assert!(!structural.is_recoverable());

        let mismatch = Error::ShaMismatch {
            expected: Hash::EMPTY_TREE,
            actual: Hash::ZERO,
        };
        assert!(mismatch.is_recoverable());
        assert!(!mismatch.is_structural());

        assert!(!Error::CorruptDelta("truncated".into()).is_recoverable());
    }

    #[test]
    fn test_sha_mismatch_message_carries_both_hashes() {
        let err = Error::ShaMismatch {
            expected: Hash::EMPTY_TREE,
            actual: Hash::ZERO,
        };
        let message = err.to_string();
        assert!(message.contains(&Hash::EMPTY_TREE.to_hex()));
        assert!(message.contains(&Hash::ZERO.to_hex()));
    }
}
