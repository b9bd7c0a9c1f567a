//! One-shot query command.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use lumen_core::error::AppError;
use lumen_core::result::AppResult;
use lumen_engine::item::DisplayItem;
use lumen_engine::sink::ChannelSink;

use crate::output::{self, OutputFormat};

/// Arguments for the query command
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Search term; multiple words are joined with spaces
    #[arg(required = true)]
    pub term: Vec<String>,

    /// Override the per-extension handler timeout
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Result display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ResultRow {
    /// Position in the ranked list
    #[tabled(rename = "#")]
    index: usize,
    /// Item id
    id: String,
    /// Primary text
    text: String,
    /// Secondary text
    subtext: String,
    /// Importance
    importance: i32,
    /// Usage count
    usage: u64,
    /// Provider score
    score: f64,
}

impl ResultRow {
    fn new(index: usize, item: &DisplayItem) -> Self {
        Self {
            index,
            id: item.id.clone(),
            text: item.text.clone(),
            subtext: item.subtext.clone(),
            importance: item.importance,
            usage: item.usage_count,
            score: item.score,
        }
    }
}

/// Execute the query command
pub async fn execute(args: &QueryArgs, config_path: &str, format: OutputFormat) -> AppResult<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(timeout_ms) = args.timeout_ms {
        config.dispatch.handler_timeout_ms = timeout_ms;
        config.validate()?;
    }

    let (sink, mut results) = ChannelSink::new();
    let (engine, loader, loaded) = super::start_engine(&config, Arc::new(sink)).await?;

    engine.on_session_visibility_changed(true).await;
    engine
        .on_query_term_changed(args.term.join(" "))
        .await
        .map_err(|e| AppError::internal(format!("Query task failed: {e}")))?;
    let published = results.try_recv().ok();

    engine.on_session_visibility_changed(false).await;
    loader.unload_all(&engine, &loaded).await;

    let Some(published) = published else {
        output::print_warning("The query produced no publication");
        return Ok(());
    };

    match format {
        OutputFormat::Table => {
            let rows: Vec<ResultRow> = published
                .items
                .iter()
                .enumerate()
                .map(|(index, item)| ResultRow::new(index, item))
                .collect();
            output::print_list(&rows, format, "No results.");
        }
        OutputFormat::Json => output::print_item(&published, format),
    }

    Ok(())
}
