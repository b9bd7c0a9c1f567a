//! Extension registry holding the currently registered extensions.
//!
//! The list is copy-on-write: mutations build a new `Arc<Vec<_>>` and swap
//! it in, so a dispatch holding an [`ExtensionSnapshot`] is never affected
//! by a concurrent `register`/`unregister`.

use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::extension::{Extension, ExtensionInfo};

/// Immutable view of the registry taken at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ExtensionSnapshot(Arc<Vec<Arc<dyn Extension>>>);

impl Deref for ExtensionSnapshot {
    type Target = [Arc<dyn Extension>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Registry of all registered extensions, in registration order.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    extensions: RwLock<Arc<Vec<Arc<dyn Extension>>>>,
}

impl ExtensionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension. A duplicate id leaves the registry unchanged.
    pub async fn register(&self, extension: Arc<dyn Extension>) -> Result<(), RegistryError> {
        let id = extension.id().to_string();
        let mut extensions = self.extensions.write().await;

        if extensions.iter().any(|e| e.id() == id) {
            warn!(extension_id = %id, "Extension registered twice");
            return Err(RegistryError::DuplicateRegistration(id));
        }

        let mut next = Vec::with_capacity(extensions.len() + 1);
        next.extend(extensions.iter().cloned());
        next.push(extension.clone());
        *extensions = Arc::new(next);

        info!(
            extension_id = %id,
            trigger_only = extension.is_trigger_only(),
            triggers = ?extension.triggers(),
            exclusive = extension.run_exclusive(),
            "Extension registered"
        );

        Ok(())
    }

    /// Unregisters an extension by id and hands it back.
    pub async fn unregister(&self, extension_id: &str) -> Result<Arc<dyn Extension>, RegistryError> {
        let mut extensions = self.extensions.write().await;

        let Some(position) = extensions.iter().position(|e| e.id() == extension_id) else {
            warn!(extension_id = %extension_id, "Unregistering an extension that is not registered");
            return Err(RegistryError::UnknownExtension(extension_id.to_string()));
        };

        let mut next: Vec<Arc<dyn Extension>> = extensions.iter().cloned().collect();
        let removed = next.remove(position);
        *extensions = Arc::new(next);

        info!(extension_id = %extension_id, "Extension unregistered");

        Ok(removed)
    }

    /// Captures the current extension list.
    pub async fn snapshot(&self) -> ExtensionSnapshot {
        ExtensionSnapshot(self.extensions.read().await.clone())
    }

    /// Gets all registered extensions.
    pub async fn all(&self) -> Vec<Arc<dyn Extension>> {
        self.snapshot().await.to_vec()
    }

    /// Gets an extension by id.
    pub async fn get(&self, extension_id: &str) -> Option<Arc<dyn Extension>> {
        let extensions = self.extensions.read().await;
        extensions.iter().find(|e| e.id() == extension_id).cloned()
    }

    /// Checks whether an extension is registered.
    pub async fn contains(&self, extension_id: &str) -> bool {
        self.get(extension_id).await.is_some()
    }

    /// Returns the extension count.
    pub async fn count(&self) -> usize {
        self.extensions.read().await.len()
    }

    /// Lists routing summaries in registration order.
    pub async fn list(&self) -> Vec<ExtensionInfo> {
        let extensions = self.extensions.read().await;
        extensions.iter().map(|e| e.info()).collect()
    }
}
