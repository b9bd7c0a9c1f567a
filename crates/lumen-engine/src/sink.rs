//! Outbound boundary to the display adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::item::DisplayItem;
use crate::query::Query;

/// One complete publication to the display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    /// Generation that produced the result.
    pub query_id: u64,
    /// Term of the query; `None` for empty-term and deactivation clears.
    pub term: Option<String>,
    /// Items in display order.
    pub items: Vec<DisplayItem>,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}

impl ResultSet {
    /// A publication that clears the display.
    pub fn empty(query_id: u64) -> Self {
        Self {
            query_id,
            term: None,
            items: Vec::new(),
            published_at: Utc::now(),
        }
    }

    /// A publication of a completed query.
    pub fn from_query(query: &Query) -> Self {
        Self {
            query_id: query.id(),
            term: Some(query.term().to_string()),
            items: query.display_items(),
            published_at: Utc::now(),
        }
    }

    /// Whether this publication clears the display.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Receives ordered result lists.
///
/// Called at most once per completed query, never concurrently.
#[async_trait]
pub trait ResultSink: Send + Sync + std::fmt::Debug {
    /// Replaces the displayed results.
    async fn publish(&self, results: ResultSet);
}

/// Forwards publications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ResultSet>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResultSet>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn publish(&self, results: ResultSet) {
        if self.sender.send(results).is_err() {
            debug!("Result receiver dropped, discarding publication");
        }
    }
}

/// Sink that drops every publication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn publish(&self, _results: ResultSet) {}
}
