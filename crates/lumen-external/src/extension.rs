//! An extension backed by an executable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lumen_engine::error::ExtensionError;
use lumen_engine::extension::Extension;
use lumen_engine::item::{ItemAction, StandardItem};
use lumen_engine::query::{Match, QueryContext};

use crate::error::ExternalError;
use crate::process::{Operation, ProcessRunner, command_available};
use crate::protocol::{self, ItemSpec, Metadata, Response};

/// An extension that answers every call by running its executable once.
///
/// Calls never overlap: the variable store doubles as the process lock.
#[derive(Debug)]
pub struct ExternalExtension {
    id: String,
    name: String,
    path: PathBuf,
    metadata: Metadata,
    triggers: Vec<String>,
    runner: ProcessRunner,
    variables: Mutex<HashMap<String, String>>,
}

impl ExternalExtension {
    /// Loads the executable at `path`: reads its metadata, checks its
    /// dependencies and initializes it.
    pub async fn load(path: &Path, runner: ProcessRunner) -> Result<Self, ExternalError> {
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let stdout = runner
            .run(path, Operation::Metadata, &HashMap::new(), None)
            .await?;
        let metadata = Metadata::from_response(&protocol::parse_response(&stdout)?)?;

        for dependency in &metadata.dependencies {
            if !command_available(dependency).await {
                return Err(ExternalError::MissingDependency(dependency.clone()));
            }
        }

        let triggers = metadata
            .trigger()
            .map(|trigger| vec![trigger.to_string()])
            .unwrap_or_default();

        let extension = Self {
            name: metadata.name.clone().unwrap_or_else(|| id.clone()),
            id,
            path: path.to_path_buf(),
            metadata,
            triggers,
            runner,
            variables: Mutex::new(HashMap::new()),
        };

        extension.call(Operation::Initialize, None).await?;

        info!(
            extension_id = %extension.id,
            name = %extension.name,
            version = extension.metadata.version.as_deref().unwrap_or("N/A"),
            trigger = ?extension.triggers.first(),
            "External extension initialized"
        );

        Ok(extension)
    }

    /// Path of the executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata reported by the executable.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Variables currently stored for the extension.
    pub async fn variables(&self) -> HashMap<String, String> {
        self.variables.lock().await.clone()
    }

    /// Runs `FINALIZE`. Failures are logged only.
    pub async fn finalize(&self) {
        match self.call(Operation::Finalize, None).await {
            Ok(_) => debug!(extension_id = %self.id, "External extension finalized"),
            Err(e) => warn!(extension_id = %self.id, error = %e, "Finalization failed"),
        }
    }

    /// Runs one operation and stores the variables of its answer.
    ///
    /// Empty output is accepted and yields `None`, except for queries.
    async fn call(&self, op: Operation, term: Option<&str>) -> Result<Option<Response>, ExternalError> {
        let mut variables = self.variables.lock().await;

        let stdout = self.runner.run(&self.path, op, &variables, term).await?;
        if op != Operation::Query && stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let response = protocol::parse_response(&stdout)?;
        match protocol::variables(&response) {
            Ok(vars) => *variables = vars,
            Err(e) => {
                warn!(extension_id = %self.id, op = %op, error = %e, "Dropping stored variables");
                variables.clear();
            }
        }

        Ok(Some(response))
    }

    fn to_match(&self, spec: ItemSpec, query: &QueryContext) -> Match {
        let actions = spec
            .actions
            .into_iter()
            .map(|action| ItemAction::spawn(action.name, action.command, action.arguments))
            .collect();

        let item = StandardItem::new(spec.id.clone())
            .with_text(spec.name)
            .with_subtext(spec.description)
            .with_completion(spec.completion)
            .with_icon(spec.icon)
            .with_importance(spec.importance)
            .with_usage_count(query.usage_count(&spec.id))
            .with_actions(actions);

        Match::from_item(item, spec.score)
    }

    async fn session_hook(&self, op: Operation) -> Result<(), ExtensionError> {
        self.call(op, None).await.map(|_| ()).map_err(|e| {
            warn!(extension_id = %self.id, op = %op, error = %e, "Session hook failed");
            ExtensionError::from(e)
        })
    }
}

#[async_trait]
impl Extension for ExternalExtension {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_trigger_only(&self) -> bool {
        !self.triggers.is_empty()
    }

    fn triggers(&self) -> &[String] {
        &self.triggers
    }

    async fn handle_query(&self, query: &QueryContext) -> Result<Vec<Match>, ExtensionError> {
        let response = self
            .call(Operation::Query, Some(query.term()))
            .await?
            .unwrap_or_default();
        let specs = protocol::items(&response, &self.id)?;

        debug!(
            extension_id = %self.id,
            query_id = query.query_id(),
            items = specs.len(),
            "External query answered"
        );

        Ok(specs
            .into_iter()
            .map(|spec| self.to_match(spec, query))
            .collect())
    }

    async fn setup_session(&self) -> Result<(), ExtensionError> {
        self.session_hook(Operation::SetupSession).await
    }

    async fn teardown_session(&self) -> Result<(), ExtensionError> {
        self.session_hook(Operation::TeardownSession).await
    }
}
