//! The extension contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExtensionError;
use crate::query::{Match, QueryContext};

/// Summary of an extension's routing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    /// Unique extension identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Participates only when one of its triggers matches.
    pub trigger_only: bool,
    /// First-word tokens that activate the extension.
    pub triggers: Vec<String>,
    /// Replaces all other results when triggered.
    pub exclusive: bool,
}

/// A registered provider of search results.
///
/// Handlers return their matches in a private buffer; the dispatcher merges
/// the buffers once every participant of a phase has finished. Any hook may
/// block on I/O: each call runs as its own task.
#[async_trait]
pub trait Extension: Send + Sync + std::fmt::Debug {
    /// Unique identity within the registry.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str {
        self.id()
    }

    /// Whether the extension only runs when a trigger matches.
    fn is_trigger_only(&self) -> bool {
        false
    }

    /// Trigger tokens, compared by exact equality with the first word of
    /// the term. Treated as a set.
    fn triggers(&self) -> &[String] {
        &[]
    }

    /// Whether a triggered invocation replaces every other provider.
    fn run_exclusive(&self) -> bool {
        false
    }

    /// Produces matches for a query.
    async fn handle_query(&self, query: &QueryContext) -> Result<Vec<Match>, ExtensionError>;

    /// Produces matches when no provider matched in the regular phases.
    async fn handle_fallback_query(
        &self,
        _query: &QueryContext,
    ) -> Result<Vec<Match>, ExtensionError> {
        Ok(Vec::new())
    }

    /// Allocates per-session resources.
    async fn setup_session(&self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Releases per-session resources.
    async fn teardown_session(&self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Routing summary.
    fn info(&self) -> ExtensionInfo {
        ExtensionInfo {
            id: self.id().to_string(),
            name: self.name().to_string(),
            trigger_only: self.is_trigger_only(),
            triggers: self.triggers().to_vec(),
            exclusive: self.run_exclusive(),
        }
    }
}

/// Whether `extension` takes part in the trigger phase for `potential_trigger`.
pub fn is_triggered_by(extension: &dyn Extension, potential_trigger: &str) -> bool {
    extension.is_trigger_only()
        && extension
            .triggers()
            .iter()
            .any(|trigger| trigger == potential_trigger)
}
