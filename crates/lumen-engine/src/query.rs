//! Query model: matches, the per-dispatch query and the context handed to
//! extensions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ActivationError;
use crate::history::UsageHistory;
use crate::item::{DisplayItem, Item};

/// One candidate result: an item and the provider's relevance score.
#[derive(Clone)]
pub struct Match {
    /// The result payload.
    pub item: Arc<dyn Item>,
    /// Provider-defined relevance. Only comparable within one provider.
    pub score: f64,
}

impl Match {
    /// Creates a match.
    pub fn new(item: Arc<dyn Item>, score: f64) -> Self {
        Self { item, score }
    }

    /// Convenience constructor taking the item by value.
    pub fn from_item<I: Item + 'static>(item: I, score: f64) -> Self {
        Self::new(Arc::new(item), score)
    }

    /// Projection handed to the display adapter.
    pub fn to_display(&self) -> DisplayItem {
        DisplayItem {
            id: self.item.id().to_string(),
            text: self.item.text().to_string(),
            subtext: self.item.subtext().to_string(),
            completion: self.item.completion().to_string(),
            icon: self.item.icon().map(str::to_string),
            importance: self.item.importance(),
            usage_count: self.item.usage_count(),
            score: self.score,
            actions: self.item.actions().iter().map(|a| a.name.clone()).collect(),
        }
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("item", &self.item.id())
            .field("score", &self.score)
            .finish()
    }
}

/// Lifecycle state of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    /// Extensions are still running.
    Dispatching,
    /// Dispatch completed and the match order is final.
    Ranked,
    /// Superseded or torn down; never published.
    Cancelled,
}

/// Which route produced a query's matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "route")]
pub enum DispatchOutcome {
    /// Not finished yet.
    Pending,
    /// Triggered and global extensions merged and ranked.
    Merged,
    /// An exclusive triggered extension supplied the whole result.
    Exclusive {
        /// Id of the exclusive extension.
        extension: String,
    },
    /// Regular phases were empty; fallback handlers supplied the result.
    Fallback,
    /// Nothing matched, not even fallbacks.
    Empty,
}

/// One in-flight or completed search.
#[derive(Debug, Clone)]
pub struct Query {
    id: u64,
    term: String,
    matches: Vec<Match>,
    state: QueryState,
    outcome: DispatchOutcome,
}

impl Query {
    /// Creates a query in the `Dispatching` state. `term` must already be trimmed.
    pub(crate) fn new(id: u64, term: String) -> Self {
        Self {
            id,
            term,
            matches: Vec::new(),
            state: QueryState::Dispatching,
            outcome: DispatchOutcome::Pending,
        }
    }

    pub(crate) fn complete(&mut self, matches: Vec<Match>, outcome: DispatchOutcome) {
        self.matches = matches;
        self.outcome = outcome;
        self.state = QueryState::Ranked;
    }

    pub(crate) fn cancel(&mut self) {
        self.matches.clear();
        self.state = QueryState::Cancelled;
    }

    /// Generation that produced this query.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The trimmed search term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// The matches in display order.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Lifecycle state.
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Route that produced the matches.
    pub fn outcome(&self) -> &DispatchOutcome {
        &self.outcome
    }

    /// Display projection of all matches.
    pub fn display_items(&self) -> Vec<DisplayItem> {
        self.matches.iter().map(Match::to_display).collect()
    }

    /// Activates `matches[index]`.
    pub fn activate(&self, index: usize) -> Result<&dyn Item, ActivationError> {
        let matched = self
            .matches
            .get(index)
            .ok_or(ActivationError::IndexOutOfRange {
                index,
                len: self.matches.len(),
            })?;
        matched.item.activate()?;
        Ok(matched.item.as_ref())
    }
}

/// What an extension sees of the query it is asked to handle.
///
/// Cloning is cheap; every extension call gets its own copy.
#[derive(Debug, Clone)]
pub struct QueryContext {
    query_id: u64,
    term: Arc<str>,
    history: Arc<UsageHistory>,
    cancel: CancellationToken,
}

impl QueryContext {
    /// Creates a context for `term`.
    pub fn new(
        query_id: u64,
        term: impl Into<Arc<str>>,
        history: Arc<UsageHistory>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            query_id,
            term: term.into(),
            history,
            cancel,
        }
    }

    /// Generation of the query.
    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    /// The trimmed search term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// First space-delimited token, or the whole term.
    pub fn potential_trigger(&self) -> &str {
        potential_trigger(&self.term)
    }

    /// Everything after the first space, or an empty string.
    pub fn arguments(&self) -> &str {
        self.term
            .split_once(' ')
            .map(|(_, rest)| rest)
            .unwrap_or("")
    }

    /// Usage count of an item from the history store.
    pub fn usage_count(&self, item_id: &str) -> u64 {
        self.history.usage_count(item_id)
    }

    /// Whether the query has been superseded.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the query is superseded.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Substring up to the first space, or the whole term.
pub fn potential_trigger(term: &str) -> &str {
    term.split_once(' ').map(|(head, _)| head).unwrap_or(term)
}
