//! Lumen launcher shell
//!
//! Interactive entry point that wires the engine to external extensions and
//! stands in for the launcher window: stdin lines are keystrokes and window
//! events, published results are printed to stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{EnvFilter, fmt};

use lumen_core::config::AppConfig;
use lumen_core::result::AppResult;
use lumen_engine::engine::LauncherEngine;
use lumen_engine::sink::{ChannelSink, ResultSet};
use lumen_external::ExtensionLoader;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Launcher error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> AppResult<AppConfig> {
    let config_path =
        std::env::var("LUMEN_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    AppConfig::load(&config_path)
}

/// Initialize tracing/logging on stderr
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
    }
}

/// A line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Term(&'a str),
    Type(&'a str),
    Open(usize),
    Show,
    Hide,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> Command<'_> {
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Term(line);
    };

    let (name, argument) = rest.split_once(' ').unwrap_or((rest, ""));
    match name {
        "type" => Command::Type(argument),
        "open" => match argument.trim().parse() {
            Ok(index) => Command::Open(index),
            Err(_) => Command::Invalid(format!("':open' expects an index, got '{argument}'")),
        },
        "show" => Command::Show,
        "hide" => Command::Hide,
        "quit" | "q" => Command::Quit,
        other => Command::Invalid(format!("Unknown command ':{other}'")),
    }
}

/// Main shell loop
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting Lumen v{}", env!("CARGO_PKG_VERSION"));

    let (sink, results) = ChannelSink::new();
    let engine = LauncherEngine::new(&config, Arc::new(sink));
    let printer = tokio::spawn(print_results(results));

    let loader = ExtensionLoader::new(&config.extensions);
    let loaded = if config.extensions.auto_load {
        loader.load_directory().await?
    } else {
        Vec::new()
    };
    let registered = loader.register_all(&engine, &loaded).await;
    tracing::info!(registered, "Extensions registered");

    if config.session.active_on_start {
        engine.on_session_visibility_changed(true).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_command(&line) {
            Command::Term(term) => {
                if let Err(e) = engine.on_query_term_changed(term).await {
                    tracing::error!(error = %e, "Query task failed");
                }
            }
            Command::Type(text) => {
                let mut last = None;
                for (end, c) in text.char_indices() {
                    last = Some(engine.on_query_term_changed(&text[..end + c.len_utf8()]));
                }
                if let Some(handle) = last
                    && let Err(e) = handle.await
                {
                    tracing::error!(error = %e, "Query task failed");
                }
            }
            Command::Open(index) => {
                if let Err(e) = engine.on_result_index_activated(index).await {
                    eprintln!("{e}");
                }
            }
            Command::Show => {
                engine.on_session_visibility_changed(true).await;
            }
            Command::Hide => {
                engine.on_session_visibility_changed(false).await;
            }
            Command::Quit => break,
            Command::Invalid(message) => eprintln!("{message}"),
        }
    }

    engine.on_session_visibility_changed(false).await;
    loader.unload_all(&engine, &loaded).await;

    drop(engine);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Result printer failed");
    }

    tracing::info!("Lumen stopped");
    Ok(())
}

/// Prints every publication until the engine is dropped.
async fn print_results(mut results: UnboundedReceiver<ResultSet>) {
    while let Some(set) = results.recv().await {
        match &set.term {
            None => println!("[{}] (cleared)", set.query_id),
            Some(term) if set.is_empty() => println!("[{}] {term}: no results", set.query_id),
            Some(term) => {
                println!("[{}] {term}", set.query_id);
                for (index, item) in set.items.iter().enumerate() {
                    if item.subtext.is_empty() {
                        println!("  {index:>2}. {}", item.text);
                    } else {
                        println!("  {index:>2}. {}  ({})", item.text, item.subtext);
                    }
                }
            }
        }
    }
}
