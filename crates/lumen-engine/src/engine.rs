//! Launcher engine: the entry point the display adapter talks to.
//!
//! Every new term starts a new generation and cancels the previous one.
//! Publication is serialized and only the current generation may publish,
//! so a result for an older term never reaches the display after a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lumen_core::config::AppConfig;

use crate::dispatcher::Dispatcher;
use crate::error::{ActivationError, RegistryError};
use crate::extension::{Extension, ExtensionInfo};
use crate::history::UsageHistory;
use crate::query::{Query, QueryState};
use crate::registry::ExtensionRegistry;
use crate::session::{SessionManager, SessionReport};
use crate::sink::{ResultSet, ResultSink};

/// Cloneable handle to the launcher engine.
#[derive(Debug, Clone)]
pub struct LauncherEngine {
    inner: Arc<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    registry: Arc<ExtensionRegistry>,
    history: Arc<UsageHistory>,
    dispatcher: Dispatcher,
    session: SessionManager,
    sink: Arc<dyn ResultSink>,
    /// Id of the most recent generation.
    generation: AtomicU64,
    /// Token of the most recent generation.
    current: StdMutex<CancellationToken>,
    /// Dispatches hold it shared, session transitions exclusively.
    gate: RwLock<()>,
    /// Last published query; the lock also serializes publication.
    published: Mutex<Option<Arc<Query>>>,
}

impl LauncherEngine {
    /// Creates an engine with an empty registry and an inactive session.
    pub fn new(config: &AppConfig, sink: Arc<dyn ResultSink>) -> Self {
        Self::with_history(config, sink, Arc::new(UsageHistory::new()))
    }

    /// Creates an engine that reads and records usage in `history`.
    pub fn with_history(
        config: &AppConfig,
        sink: Arc<dyn ResultSink>,
        history: Arc<UsageHistory>,
    ) -> Self {
        let registry = Arc::new(ExtensionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), history.clone(), &config.dispatch);
        let session = SessionManager::new(registry.clone(), &config.session);

        Self {
            inner: Arc::new(EngineInner {
                registry,
                history,
                dispatcher,
                session,
                sink,
                generation: AtomicU64::new(0),
                current: StdMutex::new(CancellationToken::new()),
                gate: RwLock::new(()),
                published: Mutex::new(None),
            }),
        }
    }

    /// Handles a keystroke: supersedes the running query and dispatches `term`.
    ///
    /// The returned handle resolves once this generation has published or
    /// been discarded.
    pub fn on_query_term_changed(&self, term: impl Into<String>) -> JoinHandle<()> {
        let term = term.into();
        let (id, token) = self.inner.next_generation();
        let inner = self.inner.clone();

        tokio::spawn(async move { inner.run_query(id, term, token).await })
    }

    /// Activates a result of the most recently published query and records
    /// the use.
    pub async fn on_result_index_activated(&self, index: usize) -> Result<(), ActivationError> {
        let query = self
            .inner
            .published
            .lock()
            .await
            .clone()
            .ok_or(ActivationError::NoPublishedQuery)?;

        let item = query.activate(index).inspect_err(|e| {
            warn!(query_id = query.id(), index, error = %e, "Activation failed");
        })?;

        let count = self.inner.history.record(item.id());
        info!(
            query_id = query.id(),
            index,
            item_id = %item.id(),
            usage_count = count,
            "Result activated"
        );

        Ok(())
    }

    /// Shows or hides the launcher.
    ///
    /// Hiding cancels the running query, waits until its dispatch has
    /// finished, tears the session down and clears the display.
    pub async fn on_session_visibility_changed(&self, active: bool) -> SessionReport {
        let inner = &self.inner;

        if active {
            let _gate = inner.gate.write().await;
            return inner.session.set_active(true).await;
        }

        let (id, _token) = inner.next_generation();
        let _gate = inner.gate.write().await;
        let report = inner.session.set_active(false).await;

        let mut published = inner.published.lock().await;
        *published = None;
        inner.sink.publish(ResultSet::empty(id)).await;
        debug!(query_id = id, "Display cleared on deactivation");

        report
    }

    /// Registers an extension.
    pub async fn register_extension(&self, extension: Arc<dyn Extension>) -> Result<(), RegistryError> {
        self.inner.registry.register(extension).await
    }

    /// Unregisters an extension and hands it back.
    pub async fn unregister_extension(&self, extension_id: &str) -> Result<Arc<dyn Extension>, RegistryError> {
        self.inner.registry.unregister(extension_id).await
    }

    /// Routing summaries of the registered extensions.
    pub async fn extensions(&self) -> Vec<ExtensionInfo> {
        self.inner.registry.list().await
    }

    /// The most recently published query.
    pub async fn published(&self) -> Option<Arc<Query>> {
        self.inner.published.lock().await.clone()
    }

    /// Whether a session is active.
    pub async fn is_active(&self) -> bool {
        self.inner.session.is_active().await
    }

    /// Extension registry.
    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.inner.registry
    }

    /// Usage history.
    pub fn history(&self) -> &Arc<UsageHistory> {
        &self.inner.history
    }
}

impl EngineInner {
    /// Starts a new generation and cancels the previous one.
    fn next_generation(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        std::mem::replace(&mut *current, token.clone()).cancel();
        (id, token)
    }

    fn is_current(&self, id: u64, token: &CancellationToken) -> bool {
        !token.is_cancelled() && self.generation.load(Ordering::SeqCst) == id
    }

    async fn run_query(&self, id: u64, term: String, token: CancellationToken) {
        let _gate = self.gate.read().await;
        if token.is_cancelled() {
            debug!(query_id = id, "Query superseded before dispatch");
            return;
        }

        match self.dispatcher.dispatch(id, &term, &token).await {
            Err(_) => self.publish(id, &token, None).await,
            Ok(query) if query.state() == QueryState::Cancelled => {
                debug!(query_id = id, "Query cancelled, nothing published");
            }
            Ok(query) => self.publish(id, &token, Some(Arc::new(query))).await,
        }
    }

    async fn publish(&self, id: u64, token: &CancellationToken, query: Option<Arc<Query>>) {
        let mut published = self.published.lock().await;
        if !self.is_current(id, token) {
            debug!(query_id = id, "Discarding stale result");
            return;
        }

        let results = match &query {
            Some(query) => ResultSet::from_query(query),
            None => ResultSet::empty(id),
        };
        debug!(query_id = id, items = results.items.len(), "Publishing results");
        self.sink.publish(results).await;
        *published = query;
    }
}
