//! Application configuration schemas.
//!
//! All configuration structs are deserialized from an optional TOML file
//! layered with `LUMEN__`-style environment variables via the `config`
//! crate. Each sub-module represents a logical configuration section and
//! every field has a default, so an empty source is a valid configuration.

pub mod dispatch;
pub mod extensions;
pub mod logging;
pub mod session;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::dispatch::DispatchConfig;
use self::extensions::ExtensionsConfig;
use self::logging::LoggingConfig;
use self::session::SessionConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Environment variable prefix for overrides (`LUMEN_DISPATCH__MAX_CONCURRENCY=4`).
pub const ENV_PREFIX: &str = "LUMEN";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Query dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// External extension settings.
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Environment variables prefixed with `LUMEN_`
    /// (sections separated by `__`) take precedence over file values.
    pub fn load(path: &str) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Parse configuration from a TOML string without consulting the environment.
    pub fn from_toml(source: &str) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject values that would make the engine unusable.
    pub fn validate(&self) -> AppResult<()> {
        if self.dispatch.max_concurrency == 0 {
            return Err(AppError::validation(
                "dispatch.max_concurrency must be at least 1",
            ));
        }
        if self.dispatch.handler_timeout_ms == 0 {
            return Err(AppError::validation(
                "dispatch.handler_timeout_ms must be greater than zero",
            ));
        }
        if self.session.hook_timeout_ms == 0 {
            return Err(AppError::validation(
                "session.hook_timeout_ms must be greater than zero",
            ));
        }
        if self.extensions.process_timeout_seconds == 0 {
            return Err(AppError::validation(
                "extensions.process_timeout_seconds must be greater than zero",
            ));
        }
        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(AppError::validation(format!(
                "logging.format must be 'json' or 'pretty', got '{other}'"
            ))),
        }
    }
}

/// Helper shared by the section modules for millisecond fields.
pub(crate) fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}
