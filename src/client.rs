//! High-level client — `TrackerClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client (`client.products()`,
//! `client.price_history()`, `client.sessions()`). This module keeps the
//! builder and the accessor methods.

use crate::domain::price_history::client::PriceHistory;
use crate::domain::product::client::Products;
use crate::error::SdkError;
use crate::http::TrackerHttp;
use crate::network::DEFAULT_API_URL;
use crate::session::client::Sessions;
use crate::stream::{ReconnectPolicy, StreamConfig, StreamConnection};

/// The primary entry point for the Pricewatch SDK.
#[derive(Clone)]
pub struct TrackerClient {
    pub(crate) http: TrackerHttp,
    pub(crate) stream_config: StreamConfig,
}

impl TrackerClient {
    pub fn builder() -> TrackerClientBuilder {
        TrackerClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn products(&self) -> Products<'_> {
        Products { client: self }
    }

    pub fn price_history(&self) -> PriceHistory<'_> {
        PriceHistory { client: self }
    }

    pub fn sessions(&self) -> Sessions<'_> {
        Sessions { client: self }
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.stream_config
    }

    /// Create a new stream connection from the current config.
    ///
    /// The connection is intentionally not embedded in `TrackerClient`:
    /// its lifetime belongs to a product view, not to the client.
    pub fn stream(&self) -> StreamConnection {
        StreamConnection::new(self.stream_config.clone())
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct TrackerClientBuilder {
    base_url: String,
    stream_url: Option<String>,
    reconnect: ReconnectPolicy,
}

impl Default for TrackerClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            stream_url: None,
            reconnect: ReconnectPolicy::None,
        }
    }
}

impl TrackerClientBuilder {
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Override the stream endpoint; defaults to `{base_url}/track-price`.
    pub fn stream_url(mut self, url: &str) -> Self {
        self.stream_url = Some(url.to_string());
        self
    }

    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn build(self) -> Result<TrackerClient, SdkError> {
        let base = self.base_url.trim_end_matches('/').to_string();
        let stream_url = self
            .stream_url
            .unwrap_or_else(|| format!("{}/track-price", base));

        Ok(TrackerClient {
            http: TrackerHttp::new(&base)?,
            stream_config: StreamConfig {
                url: stream_url,
                reconnect: self.reconnect,
                ..StreamConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_derived_from_base() {
        let client = TrackerClient::builder()
            .base_url("http://localhost:8000/")
            .build()
            .unwrap();
        assert_eq!(
            client.stream_config().url,
            "http://localhost:8000/track-price"
        );
    }

    #[test]
    fn test_explicit_stream_url_wins() {
        let client = TrackerClient::builder()
            .base_url("http://localhost:8000")
            .stream_url("http://stream.localhost:9000/track-price")
            .build()
            .unwrap();
        assert_eq!(
            client.stream_config().url,
            "http://stream.localhost:9000/track-price"
        );
    }

    #[test]
    fn test_reconnect_policy_flows_into_stream_config() {
        let client = TrackerClient::builder()
            .reconnect(ReconnectPolicy::Backoff {
                base_delay_ms: 500,
                max_attempts: 3,
            })
            .build()
            .unwrap();
        assert!(matches!(
            client.stream_config().reconnect,
            ReconnectPolicy::Backoff { .. }
        ));
    }
}
