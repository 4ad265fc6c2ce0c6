//! Remote peer configuration

use crate::{Error, Result};

/// Default peer URL when none is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Authentication credentials
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// Sent as a bearer token
    ApiKey(String),
    /// No authentication
    None,
}

/// Sync client configuration
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Base URL of the peer
    pub api_url: String,
    /// Authentication credentials
    pub auth: Auth,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            api_url: DEFAULT_API_URL.to_string(),
            auth: Auth::None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    /// Create config from `TREESYNC_REMOTE_URL`, `TREESYNC_API_KEY` and
    /// `TREESYNC_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("TREESYNC_REMOTE_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let auth = match lookup("TREESYNC_API_KEY") {
            Some(key) if !key.is_empty() => Auth::ApiKey(key),
            _ => Auth::None,
        };

        let timeout_secs = match lookup("TREESYNC_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Config(format!("TREESYNC_TIMEOUT_SECS must be a number, got '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(SyncConfig {
            api_url,
            auth,
            timeout_secs,
        })
    }

    /// Override the peer URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.auth, Auth::None);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_from_variables() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("TREESYNC_REMOTE_URL", "https://peer.example"),
            ("TREESYNC_API_KEY", "secret"),
            ("TREESYNC_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://peer.example");
        assert_eq!(config.auth, Auth::ApiKey("secret".into()));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_bad_timeout() {
        let err = SyncConfig::from_lookup(lookup(&[("TREESYNC_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
