//! Client configuration.
//!
//! Configuration priority: explicit construction > environment variables >
//! built-in defaults.

use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings consumed by the remote gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `TOME_API_URL` and
    /// `TOME_REQUEST_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url = env::var("TOME_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let request_timeout_secs = env::var("TOME_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Self {
            base_url,
            request_timeout_secs,
        }
    }
}
