//! CLI command definitions and dispatch.

pub mod config;
pub mod extensions;
pub mod query;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use lumen_core::config::AppConfig;
use lumen_core::result::AppResult;
use lumen_engine::engine::LauncherEngine;
use lumen_engine::sink::ResultSink;
use lumen_external::{ExtensionLoader, ExternalExtension};

use crate::output::OutputFormat;

/// Lumen launcher engine command-line interface
#[derive(Debug, Parser)]
#[command(name = "lumen-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one query through the external extensions
    Query(query::QueryArgs),
    /// External extension management
    Extensions(extensions::ExtensionsArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> AppResult<()> {
        match &self.command {
            Commands::Query(args) => query::execute(args, &self.config, self.format).await,
            Commands::Extensions(args) => {
                extensions::execute(args, &self.config, self.format).await
            }
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> AppResult<AppConfig> {
    AppConfig::load(config_path)
}

/// Helper: build an engine with the configured external extensions
/// registered.
pub async fn start_engine(
    config: &AppConfig,
    sink: Arc<dyn ResultSink>,
) -> AppResult<(LauncherEngine, ExtensionLoader, Vec<Arc<ExternalExtension>>)> {
    let engine = LauncherEngine::new(config, sink);
    let loader = ExtensionLoader::new(&config.extensions);
    let loaded = loader.load_directory().await?;
    loader.register_all(&engine, &loaded).await;
    Ok((engine, loader, loaded))
}
