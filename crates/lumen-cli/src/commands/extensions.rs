//! External extension CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use lumen_core::error::AppError;
use lumen_core::result::AppResult;
use lumen_engine::sink::NullSink;
use lumen_external::{ExternalExtension, ProcessRunner};

use crate::output::{self, OutputFormat};

/// Arguments for extension commands
#[derive(Debug, Args)]
pub struct ExtensionsArgs {
    /// Extension subcommand
    #[command(subcommand)]
    pub command: ExtensionsCommand,
}

/// Extension subcommands
#[derive(Debug, Subcommand)]
pub enum ExtensionsCommand {
    /// List the extensions that load from the configured directory
    List,
    /// Load a single executable and show its metadata
    Inspect {
        /// Path to the executable
        path: PathBuf,
    },
}

/// Extension display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ExtensionRow {
    /// Extension id
    id: String,
    /// Name
    name: String,
    /// Routing mode
    routing: String,
    /// Triggers
    triggers: String,
}

/// Execute extension commands
pub async fn execute(
    args: &ExtensionsArgs,
    config_path: &str,
    format: OutputFormat,
) -> AppResult<()> {
    let config = super::load_config(config_path)?;

    match &args.command {
        ExtensionsCommand::List => {
            let (engine, loader, loaded) = super::start_engine(&config, Arc::new(NullSink)).await?;

            let rows: Vec<ExtensionRow> = engine
                .extensions()
                .await
                .into_iter()
                .map(|info| ExtensionRow {
                    routing: if info.trigger_only { "trigger" } else { "global" }.to_string(),
                    triggers: info.triggers.join(", "),
                    id: info.id,
                    name: info.name,
                })
                .collect();

            loader.unload_all(&engine, &loaded).await;

            output::print_list(
                &rows,
                format,
                &format!("No extensions in '{}'.", loader.directory().display()),
            );
        }
        ExtensionsCommand::Inspect { path } => {
            if !path.is_file() {
                return Err(AppError::not_found(format!(
                    "No extension executable at '{}'",
                    path.display()
                )));
            }
            let runner = ProcessRunner::new(config.extensions.process_timeout());
            let extension = ExternalExtension::load(path, runner).await?;
            output::print_item(extension.metadata(), format);
            extension.finalize().await;
        }
    }

    Ok(())
}
