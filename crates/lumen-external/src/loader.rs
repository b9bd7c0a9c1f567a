//! Loads external extensions from a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use lumen_core::config::extensions::ExtensionsConfig;
use lumen_engine::engine::LauncherEngine;
use lumen_engine::extension::Extension;

use crate::error::ExternalError;
use crate::extension::ExternalExtension;
use crate::process::ProcessRunner;

/// Scans a directory for extension executables and loads them.
#[derive(Debug, Clone)]
pub struct ExtensionLoader {
    directory: PathBuf,
    runner: ProcessRunner,
}

impl ExtensionLoader {
    /// Creates a loader for `config.directory`.
    pub fn new(config: &ExtensionsConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.directory),
            runner: ProcessRunner::new(config.process_timeout()),
        }
    }

    /// Directory scanned by [`load_directory`](Self::load_directory).
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lists executable regular files in the directory, sorted by file name.
    ///
    /// A missing directory yields an empty list.
    pub async fn discover(&self) -> Result<Vec<PathBuf>, ExternalError> {
        if !tokio::fs::try_exists(&self.directory).await? {
            warn!(directory = %self.directory.display(), "Extension directory does not exist");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() && is_executable(&metadata) {
                paths.push(entry.path());
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    /// Loads every discovered executable. Failures are logged and skipped.
    pub async fn load_directory(&self) -> Result<Vec<Arc<ExternalExtension>>, ExternalError> {
        let paths = self.discover().await?;
        let mut loaded = Vec::with_capacity(paths.len());

        for path in paths {
            match ExternalExtension::load(&path, self.runner.clone()).await {
                Ok(extension) => loaded.push(Arc::new(extension)),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to load external extension");
                }
            }
        }

        info!(
            directory = %self.directory.display(),
            loaded = loaded.len(),
            "External extensions loaded"
        );

        Ok(loaded)
    }

    /// Registers `extensions` with the engine and returns the number that
    /// were accepted. Duplicates are logged and skipped.
    pub async fn register_all(
        &self,
        engine: &LauncherEngine,
        extensions: &[Arc<ExternalExtension>],
    ) -> usize {
        let mut registered = 0;
        for extension in extensions {
            let handle: Arc<dyn Extension> = extension.clone();
            match engine.register_extension(handle).await {
                Ok(()) => registered += 1,
                Err(e) => warn!(extension_id = %extension.id(), error = %e, "Skipping extension"),
            }
        }
        registered
    }

    /// Unregisters and finalizes `extensions`.
    pub async fn unload_all(&self, engine: &LauncherEngine, extensions: &[Arc<ExternalExtension>]) {
        for extension in extensions {
            if let Err(e) = engine.unregister_extension(extension.id()).await {
                warn!(extension_id = %extension.id(), error = %e, "Unregister failed");
            }
            extension.finalize().await;
        }
        info!(count = extensions.len(), "External extensions unloaded");
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}
