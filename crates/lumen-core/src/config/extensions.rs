//! External extension configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// External (process-based) extension configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Directory scanned for extension executables.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Whether to load extensions from `directory` on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Timeout for one extension process run in seconds.
    #[serde(default = "default_process_timeout")]
    pub process_timeout_seconds: u64,
}

impl ExtensionsConfig {
    /// Process timeout as a [`Duration`].
    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_seconds)
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            auto_load: true,
            process_timeout_seconds: default_process_timeout(),
        }
    }
}

fn default_directory() -> String {
    "./extensions".to_string()
}

fn default_true() -> bool {
    true
}

fn default_process_timeout() -> u64 {
    10
}
