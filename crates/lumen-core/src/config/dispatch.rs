//! Query dispatch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings that shape how a single query is fanned out to extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per extension call timeout in milliseconds.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_ms: u64,
    /// Maximum number of extension calls running at once for one query.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Whether fallback-only results are ranked like regular results.
    #[serde(default)]
    pub rank_fallback_results: bool,
}

impl DispatchConfig {
    /// Handler timeout as a [`Duration`].
    pub fn handler_timeout(&self) -> Duration {
        super::millis(self.handler_timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: default_handler_timeout(),
            max_concurrency: default_max_concurrency(),
            rank_fallback_results: false,
        }
    }
}

fn default_handler_timeout() -> u64 {
    2000
}

fn default_max_concurrency() -> usize {
    16
}
