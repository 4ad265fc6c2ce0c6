//! HTTP peer
//!
//! Endpoints, relative to the configured base URL:
//! - `GET /updates?contentHash=<hex>&modifiedAt=<stamp>` returns [`Updates`]
//! - `GET /ids` returns a JSON array of live leaf paths

use super::{Auth, LocalMeta, RemotePeer, SyncConfig, Updates};
use crate::{Error, Result};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// A [`RemotePeer`] reached over HTTP
pub struct HttpPeer {
    config: SyncConfig,
    client: Client,
}

impl HttpPeer {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(HttpPeer { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SyncConfig::from_env()?)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn add_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            Auth::ApiKey(key) => builder.header("Authorization", format!("Bearer {}", key)),
            Auth::None => builder,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self
            .add_auth(builder)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(Error::Remote(format!("peer returned {}: {}", status, text)));
        }

        response.json().map_err(|e| Error::Http(e.to_string()))
    }
}

impl RemotePeer for HttpPeer {
    fn updates(&self, meta: &LocalMeta) -> Result<Updates> {
        let url = self.url("/updates");
        let mut query = vec![("contentHash", meta.content_hash.to_hex())];
        if let Some(stamp) = meta.modified_at {
            query.push(("modifiedAt", stamp.to_string()));
        }
        debug!(%url, modified_at = ?meta.modified_at, "requesting updates");
        self.get_json(self.client.get(&url).query(&query))
    }

    fn ids(&self) -> Result<Vec<String>> {
        let url = self.url("/ids");
        debug!(%url, "requesting live ids");
        self.get_json(self.client.get(&url))
    }
}
