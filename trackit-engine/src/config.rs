//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use trackit_core::constants::{JOURNEY_EVENT_STRUCT, REGISTRY_MODULE};

/// Connection and query configuration for the ledger gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Full node RPC endpoint
    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    /// Published package that owns the product registry module
    #[serde(default = "defaults::package_id")]
    pub package_id: String,

    /// Shared registry object holding the product table
    #[serde(default = "defaults::registry_object_id")]
    pub registry_object_id: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on event pages followed per query. Keeps one assembly
    /// from scanning the ledger without bound.
    #[serde(default = "defaults::max_event_pages")]
    pub max_event_pages: u32,

    /// Events requested per page
    #[serde(default = "defaults::event_page_size")]
    pub event_page_size: u32,

    /// Read retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

mod defaults {
    pub fn rpc_url() -> String {
        "https://api.testnet.iota.cafe".to_string()
    }
    pub fn package_id() -> String {
        "0x19831efd615bb1e1daa9793508af7a713c90dc8fe3b72fe1ff33e38713b0101e".to_string()
    }
    pub fn registry_object_id() -> String {
        "0x1853e8135230e04d9f3c51962eb137ce250525109aed3e036cbaa385abb12ca0".to_string()
    }
    pub fn request_timeout_secs() -> u64 {
        30
    }
    pub fn max_event_pages() -> u32 {
        50
    }
    pub fn event_page_size() -> u32 {
        100
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: defaults::rpc_url(),
            package_id: defaults::package_id(),
            registry_object_id: defaults::registry_object_id(),
            request_timeout_secs: defaults::request_timeout_secs(),
            max_event_pages: defaults::max_event_pages(),
            event_page_size: defaults::event_page_size(),
            retry: RetryConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fully qualified on-ledger type of journey events.
    pub fn journey_event_type(&self) -> String {
        format!(
            "{}::{}::{}",
            self.package_id, REGISTRY_MODULE, JOURNEY_EVENT_STRUCT
        )
    }
}

/// Retry policy for idempotent read operations
///
/// Applies to queries only. Submissions are never retried internally: a
/// resubmit after an ambiguous outcome could duplicate an append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5000,
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tag() {
        let config = LedgerConfig::default();
        let tag = config.journey_event_type();
        assert!(tag.ends_with("::product_registry::ProductJourneyUpdated"));
        assert!(tag.starts_with(&config.package_id));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"rpc_url": "http://localhost:9000"}"#).unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9000");
        assert_eq!(config.max_event_pages, 50);
        assert_eq!(config.retry.max_retries, 3);
    }
}
