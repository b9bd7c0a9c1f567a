//! Closure-backed extensions for embedding and quick prototypes.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::ExtensionError;
use crate::extension::Extension;
use crate::query::{Match, QueryContext};

type QueryFn =
    Arc<dyn Fn(QueryContext) -> BoxFuture<'static, Result<Vec<Match>, ExtensionError>> + Send + Sync>;
type HookFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), ExtensionError>> + Send + Sync>;

/// An [`Extension`] whose hooks are closures.
///
/// ```ignore
/// let calc = FnExtension::triggered("calc", ["calc", "="])
///     .exclusive(true)
///     .on_query(|ctx| async move { Ok(evaluate(ctx.arguments())) })
///     .build();
/// ```
pub struct FnExtension {
    id: String,
    name: String,
    trigger_only: bool,
    triggers: Vec<String>,
    exclusive: bool,
    query: Option<QueryFn>,
    fallback: Option<QueryFn>,
    setup: Option<HookFn>,
    teardown: Option<HookFn>,
}

impl std::fmt::Debug for FnExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExtension")
            .field("id", &self.id)
            .field("trigger_only", &self.trigger_only)
            .field("triggers", &self.triggers)
            .field("exclusive", &self.exclusive)
            .field("handlers", &"<closures>")
            .finish()
    }
}

impl FnExtension {
    /// Starts building a global extension.
    pub fn global(id: impl Into<String>) -> FnExtensionBuilder {
        FnExtensionBuilder::new(id.into(), false, Vec::new())
    }

    /// Starts building a trigger-only extension.
    pub fn triggered<I, S>(id: impl Into<String>, triggers: I) -> FnExtensionBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut triggers: Vec<String> = triggers.into_iter().map(Into::into).collect();
        triggers.sort();
        triggers.dedup();
        FnExtensionBuilder::new(id.into(), true, triggers)
    }
}

/// Builder for [`FnExtension`].
pub struct FnExtensionBuilder {
    inner: FnExtension,
}

impl FnExtensionBuilder {
    fn new(id: String, trigger_only: bool, triggers: Vec<String>) -> Self {
        Self {
            inner: FnExtension {
                name: id.clone(),
                id,
                trigger_only,
                triggers,
                exclusive: false,
                query: None,
                fallback: None,
                setup: None,
                teardown: None,
            },
        }
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Marks the extension as exclusive when triggered.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.inner.exclusive = exclusive;
        self
    }

    /// Sets the query handler.
    pub fn on_query<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(QueryContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Match>, ExtensionError>> + Send + 'static,
    {
        self.inner.query = Some(Arc::new(move |ctx| Box::pin(handler(ctx))));
        self
    }

    /// Sets the fallback handler.
    pub fn on_fallback<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(QueryContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Match>, ExtensionError>> + Send + 'static,
    {
        self.inner.fallback = Some(Arc::new(move |ctx| Box::pin(handler(ctx))));
        self
    }

    /// Sets the session setup hook.
    pub fn on_setup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.inner.setup = Some(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Sets the session teardown hook.
    pub fn on_teardown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.inner.teardown = Some(Arc::new(move || Box::pin(hook())));
        self
    }

    /// Finishes the extension.
    pub fn build(self) -> FnExtension {
        self.inner
    }

    /// Finishes the extension behind an `Arc`, ready for registration.
    pub fn into_arc(self) -> Arc<dyn Extension> {
        Arc::new(self.inner)
    }
}

#[async_trait]
impl Extension for FnExtension {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
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

    async fn handle_query(&self, query: &QueryContext) -> Result<Vec<Match>, ExtensionError> {
        match &self.query {
            Some(handler) => handler(query.clone()).await,
            None => Ok(Vec::new()),
        }
    }

    async fn handle_fallback_query(
        &self,
        query: &QueryContext,
    ) -> Result<Vec<Match>, ExtensionError> {
        match &self.fallback {
            Some(handler) => handler(query.clone()).await,
            None => Ok(Vec::new()),
        }
    }

    async fn setup_session(&self) -> Result<(), ExtensionError> {
        match &self.setup {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }

    async fn teardown_session(&self) -> Result<(), ExtensionError> {
        match &self.teardown {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }
}
