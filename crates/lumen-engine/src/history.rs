//! In-memory usage history.
//!
//! Ranking reads usage counts through [`Item::usage_count`](crate::item::Item);
//! extensions fill that value from this store via
//! [`QueryContext::usage_count`](crate::query::QueryContext::usage_count).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Usage statistics for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Number of activations.
    pub count: u64,
    /// Time of the last activation.
    pub last_used: DateTime<Utc>,
}

/// Concurrent map of item id to usage record.
#[derive(Debug, Default)]
pub struct UsageHistory {
    records: DashMap<String, UsageRecord>,
}

impl UsageHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one activation of `item_id` and returns the new count.
    pub fn record(&self, item_id: &str) -> u64 {
        let now = Utc::now();
        let mut entry = self
            .records
            .entry(item_id.to_string())
            .or_insert(UsageRecord {
                count: 0,
                last_used: now,
            });
        entry.count += 1;
        entry.last_used = now;
        debug!(item_id = %item_id, count = entry.count, "Recorded item usage");
        entry.count
    }

    /// Returns the activation count of `item_id` (zero if never used).
    pub fn usage_count(&self, item_id: &str) -> u64 {
        self.records.get(item_id).map(|r| r.count).unwrap_or(0)
    }

    /// Returns the full record of `item_id`.
    pub fn get(&self, item_id: &str) -> Option<UsageRecord> {
        self.records.get(item_id).map(|r| r.clone())
    }

    /// Number of distinct items with recorded usage.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
