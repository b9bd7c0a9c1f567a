//! Query dispatcher. Routes a term to extensions and merges their matches.
//!
//! Routing, in order:
//! - Trigger phase: trigger-only extensions whose trigger set contains the
//!   first word of the term. If one of them is exclusive, it runs alone and
//!   its output is the final, unranked result.
//! - Global phase: every non-trigger-only extension. Runs together with the
//!   non-exclusive triggered ones; buffers merge triggered first.
//! - Fallback phase: only when the phases above produced nothing, every
//!   extension's fallback handler runs.
//!
//! Every extension call is its own task with a timeout. A fault in one
//! extension is logged and contributes no matches.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use lumen_core::config::dispatch::DispatchConfig;

use crate::error::{EmptyTerm, ExtensionError};
use crate::extension::{Extension, is_triggered_by};
use crate::history::UsageHistory;
use crate::query::{DispatchOutcome, Match, Query, QueryContext, potential_trigger};
use crate::ranker;
use crate::registry::ExtensionRegistry;

/// Dispatch phase, used for routing and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Exclusive,
    Regular,
    Fallback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => write!(f, "exclusive"),
            Self::Regular => write!(f, "regular"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Dispatches search terms to the registered extensions.
#[derive(Debug)]
pub struct Dispatcher {
    /// Extension registry; snapshotted once per dispatch.
    registry: Arc<ExtensionRegistry>,
    /// Usage history exposed to extensions.
    history: Arc<UsageHistory>,
    /// Per call timeout.
    handler_timeout: Duration,
    /// Concurrent calls per phase.
    max_concurrency: usize,
    /// Whether fallback-only results are ranked.
    rank_fallback_results: bool,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(
        registry: Arc<ExtensionRegistry>,
        history: Arc<UsageHistory>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            registry,
            history,
            handler_timeout: config.handler_timeout(),
            max_concurrency: config.max_concurrency.max(1),
            rank_fallback_results: config.rank_fallback_results,
        }
    }

    /// Dispatches `term` as query `id`.
    ///
    /// Returns [`EmptyTerm`] for blank input. If `cancel` fires before the
    /// dispatch completes the returned query is `Cancelled` and empty.
    #[instrument(skip_all, fields(query_id = id))]
    pub async fn dispatch(
        &self,
        id: u64,
        term: &str,
        cancel: &CancellationToken,
    ) -> Result<Query, EmptyTerm> {
        let term = term.trim();
        if term.is_empty() {
            return Err(EmptyTerm);
        }

        let snapshot = self.registry.snapshot().await;
        let mut query = Query::new(id, term.to_string());
        let ctx = QueryContext::new(id, term, self.history.clone(), cancel.clone());
        let trigger = potential_trigger(term);

        let triggered: Vec<Arc<dyn Extension>> = snapshot
            .iter()
            .filter(|e| is_triggered_by(e.as_ref(), trigger))
            .cloned()
            .collect();

        if let Some(exclusive) = triggered.iter().find(|e| e.run_exclusive()).cloned() {
            let extension_id = exclusive.id().to_string();
            debug!(extension_id = %extension_id, trigger = %trigger, "Exclusive extension triggered");

            match self.fan_out(Phase::Exclusive, vec![exclusive], &ctx, cancel).await {
                Some(matches) => {
                    info!(
                        term = %term,
                        extension_id = %extension_id,
                        matches = matches.len(),
                        "Exclusive dispatch complete"
                    );
                    query.complete(
                        matches,
                        DispatchOutcome::Exclusive {
                            extension: extension_id,
                        },
                    );
                }
                None => query.cancel(),
            }
            return Ok(query);
        }

        let triggered_count = triggered.len();
        let mut participants = triggered;
        participants.extend(snapshot.iter().filter(|e| !e.is_trigger_only()).cloned());

        debug!(
            triggered = triggered_count,
            participants = participants.len(),
            "Dispatching regular phase"
        );

        let Some(mut matches) = self.fan_out(Phase::Regular, participants, &ctx, cancel).await
        else {
            query.cancel();
            return Ok(query);
        };

        if !matches.is_empty() {
            ranker::rank(&mut matches);
            info!(term = %term, matches = matches.len(), "Dispatch complete");
            query.complete(matches, DispatchOutcome::Merged);
            return Ok(query);
        }

        let Some(mut fallback) = self
            .fan_out(Phase::Fallback, snapshot.to_vec(), &ctx, cancel)
            .await
        else {
            query.cancel();
            return Ok(query);
        };

        if fallback.is_empty() {
            info!(term = %term, "Dispatch produced no matches");
            query.complete(fallback, DispatchOutcome::Empty);
        } else {
            if self.rank_fallback_results {
                ranker::rank(&mut fallback);
            }
            info!(term = %term, matches = fallback.len(), "Fallback dispatch complete");
            query.complete(fallback, DispatchOutcome::Fallback);
        }

        Ok(query)
    }

    /// Runs one phase over `extensions` concurrently and merges the private
    /// buffers in the order given. Returns `None` if cancelled.
    async fn fan_out(
        &self,
        phase: Phase,
        extensions: Vec<Arc<dyn Extension>>,
        ctx: &QueryContext,
        cancel: &CancellationToken,
    ) -> Option<Vec<Match>> {
        if cancel.is_cancelled() {
            return None;
        }
        if extensions.is_empty() {
            return Some(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut buffers: Vec<Vec<Match>> = vec![Vec::new(); extensions.len()];
        let mut tasks = JoinSet::new();

        for (index, extension) in extensions.into_iter().enumerate() {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            let timeout = self.handler_timeout;

            tasks.spawn(async move {
                let extension_id = extension.id().to_string();

                // The timeout covers the wait for a permit as well.
                let call = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| ExtensionError::failed("dispatch semaphore closed"))?;
                    match phase {
                        Phase::Fallback => extension.handle_fallback_query(&ctx).await,
                        Phase::Exclusive | Phase::Regular => extension.handle_query(&ctx).await,
                    }
                };

                let result = match tokio::time::timeout(timeout, AssertUnwindSafe(call).catch_unwind())
                    .await
                {
                    Ok(Ok(result)) => result,
                    Ok(Err(panic)) => Err(ExtensionError::Panicked {
                        extension: extension_id.clone(),
                        message: panic_message(panic.as_ref()),
                    }),
                    Err(_) => Err(ExtensionError::Timeout {
                        extension: extension_id.clone(),
                        timeout,
                    }),
                };

                (index, extension_id, result)
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.shutdown().await;
                    debug!(phase = %phase, "Phase cancelled, discarding results");
                    return None;
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, extension_id, Ok(matches)))) => {
                        debug!(
                            phase = %phase,
                            extension_id = %extension_id,
                            matches = matches.len(),
                            "Extension returned"
                        );
                        buffers[index] = matches;
                    }
                    Some(Ok((_, extension_id, Err(err)))) => {
                        warn!(
                            phase = %phase,
                            extension_id = %extension_id,
                            error = %err,
                            "Extension fault, contributing no matches"
                        );
                    }
                    Some(Err(err)) => {
                        warn!(phase = %phase, error = %err, "Extension task failed");
                    }
                },
            }
        }

        Some(buffers.into_iter().flatten().collect())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
