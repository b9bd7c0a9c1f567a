//! Session lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Timeout for a single `setup_session`/`teardown_session` hook in milliseconds.
    #[serde(default = "default_hook_timeout")]
    pub hook_timeout_ms: u64,
    /// Activate the session right after startup.
    #[serde(default)]
    pub active_on_start: bool,
}

impl SessionConfig {
    /// Hook timeout as a [`Duration`].
    pub fn hook_timeout(&self) -> Duration {
        super::millis(self.hook_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hook_timeout_ms: default_hook_timeout(),
            active_on_start: false,
        }
    }
}

fn default_hook_timeout() -> u64 {
    5000
}
