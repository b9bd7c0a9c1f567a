//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use lumen_core::config::AppConfig;
use lumen_engine::engine::LauncherEngine;
use lumen_engine::prelude::*;
use lumen_engine::sink::{ChannelSink, ResultSet};

/// How long to wait for a publication before failing.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine wired to a channel sink.
pub struct TestLauncher {
    /// The engine under test
    pub engine: LauncherEngine,
    /// Publications in the order they happened
    pub results: UnboundedReceiver<ResultSet>,
}

impl TestLauncher {
    /// Create a launcher with the default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a launcher with a custom configuration
    pub fn with_config(config: AppConfig) -> Self {
        let (sink, results) = ChannelSink::new();
        Self {
            engine: LauncherEngine::new(&config, Arc::new(sink)),
            results,
        }
    }

    /// Register extensions in the given order
    pub async fn register(&self, extensions: Vec<Arc<dyn Extension>>) {
        for extension in extensions {
            self.engine
                .register_extension(extension)
                .await
                .expect("Failed to register extension");
        }
    }

    /// Dispatch `term` and wait for the dispatch task to finish
    pub async fn query(&self, term: &str) {
        self.engine
            .on_query_term_changed(term)
            .await
            .expect("Query task panicked");
    }

    /// Wait for the next publication
    pub async fn next(&mut self) -> ResultSet {
        tokio::time::timeout(RECV_TIMEOUT, self.results.recv())
            .await
            .expect("Timed out waiting for a publication")
            .expect("Result channel closed")
    }

    /// Assert that nothing else has been published
    pub fn assert_quiet(&mut self) {
        if let Ok(set) = self.results.try_recv() {
            panic!("Unexpected publication: {set:?}");
        }
    }
}

/// Item ids of a publication, in display order.
pub fn ids(set: &ResultSet) -> Vec<&str> {
    set.items.iter().map(|item| item.id.as_str()).collect()
}

/// Per-hook call counters of a [`ScriptedExtension`].
#[derive(Debug, Default)]
pub struct Calls {
    /// `handle_query` calls
    pub query: AtomicUsize,
    /// `handle_fallback_query` calls
    pub fallback: AtomicUsize,
    /// `setup_session` calls
    pub setup: AtomicUsize,
    /// `teardown_session` calls
    pub teardown: AtomicUsize,
}

impl Calls {
    /// Read a counter
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Shared ordered log of hook events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Extension that returns canned matches and counts its calls.
#[derive(Debug)]
pub struct ScriptedExtension {
    id: String,
    trigger_only: bool,
    triggers: Vec<String>,
    exclusive: bool,
    matches: Vec<(String, i32, u64, f64)>,
    fallback: Vec<(String, f64)>,
    failing: bool,
    log: Option<EventLog>,
    /// Call counters, shared with the test
    pub calls: Arc<Calls>,
}

impl ScriptedExtension {
    /// A global extension
    pub fn global(id: &str) -> Self {
        Self {
            id: id.to_string(),
            trigger_only: false,
            triggers: Vec::new(),
            exclusive: false,
            matches: Vec::new(),
            fallback: Vec::new(),
            failing: false,
            log: None,
            calls: Arc::new(Calls::default()),
        }
    }

    /// A trigger-only extension
    pub fn triggered(id: &str, triggers: &[&str]) -> Self {
        Self {
            trigger_only: true,
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            ..Self::global(id)
        }
    }

    /// Replace every other provider when triggered
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Add a match returned from `handle_query`
    pub fn with_match(mut self, item_id: &str, importance: i32, usage: u64, score: f64) -> Self {
        self.matches.push((item_id.to_string(), importance, usage, score));
        self
    }

    /// Add a match returned from `handle_fallback_query`
    pub fn with_fallback(mut self, item_id: &str, score: f64) -> Self {
        self.fallback.push((item_id.to_string(), score));
        self
    }

    /// Fail every hook
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Record hook events into `log`
    pub fn logging(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Shared call counters
    pub fn calls(&self) -> Arc<Calls> {
        self.calls.clone()
    }

    /// Convert into a registrable trait object
    pub fn into_arc(self) -> Arc<dyn Extension> {
        Arc::new(self)
    }

    fn record(&self, event: &str) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(format!("{}:{event}", self.id));
        }
    }

    fn result(&self) -> Result<(), ExtensionError> {
        if self.failing {
            Err(ExtensionError::failed(format!("{} is broken", self.id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Extension for ScriptedExtension {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_trigger_only(&self) -> bool {
        self.trigger_only
    }

    fn triggers(&self) -> &[String] {
        &self.triggers
    }

    fn run_exclusive(&self) -> bool {
        self.exclusive
    }

    async fn handle_query(&self, _query: &QueryContext) -> Result<Vec<Match>, ExtensionError> {
        self.calls.query.fetch_add(1, Ordering::SeqCst);
        self.record("query");
        self.result()?;
        Ok(self
            .matches
            .iter()
            .map(|(id, importance, usage, score)| {
                let item = StandardItem::new(id.clone())
                    .with_importance(*importance)
                    .with_usage_count(*usage);
                Match::from_item(item, *score)
            })
            .collect())
    }

    async fn handle_fallback_query(
        &self,
        _query: &QueryContext,
    ) -> Result<Vec<Match>, ExtensionError> {
        self.calls.fallback.fetch_add(1, Ordering::SeqCst);
        self.record("fallback");
        self.result()?;
        Ok(self
            .fallback
            .iter()
            .map(|(id, score)| Match::from_item(StandardItem::new(id.clone()), *score))
            .collect())
    }

    async fn setup_session(&self) -> Result<(), ExtensionError> {
        self.calls.setup.fetch_add(1, Ordering::SeqCst);
        self.record("setup");
        self.result()
    }

    async fn teardown_session(&self) -> Result<(), ExtensionError> {
        self.calls.teardown.fetch_add(1, Ordering::SeqCst);
        self.record("teardown");
        self.result()
    }
}
