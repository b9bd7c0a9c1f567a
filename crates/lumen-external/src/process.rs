//! Child process execution for external extensions.
//!
//! Runs an extension executable with its stored variables in the
//! environment, captures stdout and enforces a timeout.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, error};

use crate::error::ExternalError;

/// Environment variable carrying the requested operation.
pub const OP_VAR: &str = "LUMEN_OP";

/// Environment variable carrying the search term of a `QUERY` call.
pub const QUERY_VAR: &str = "LUMEN_QUERY";

/// Maximum number of characters of output kept in an error message.
const MAX_ERROR_OUTPUT: usize = 2000;

/// Operations understood by an external extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Describe the extension.
    Metadata,
    /// Called once after loading.
    Initialize,
    /// Called once before unloading.
    Finalize,
    /// Launcher became visible.
    SetupSession,
    /// Launcher was hidden.
    TeardownSession,
    /// Produce items for a term.
    Query,
}

impl Operation {
    /// Value of [`OP_VAR`] for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "METADATA",
            Self::Initialize => "INITIALIZE",
            Self::Finalize => "FINALIZE",
            Self::SetupSession => "SETUPSESSION",
            Self::TeardownSession => "TEARDOWNSESSION",
            Self::Query => "QUERY",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs extension executables.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Creates a runner whose processes are killed after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Process timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `path` for `op` and returns its stdout.
    ///
    /// `variables` are added to the inherited environment, followed by the
    /// operation and, for queries, the term.
    pub async fn run(
        &self,
        path: &Path,
        op: Operation,
        variables: &HashMap<String, String>,
        term: Option<&str>,
    ) -> Result<Vec<u8>, ExternalError> {
        let start = Instant::now();

        let mut cmd = Command::new(path);
        cmd.envs(variables)
            .env(OP_VAR, op.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(term) = term {
            cmd.env(QUERY_VAR, term);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                error!(path = %path.display(), op = %op, error = %source, "Failed to start extension");
                return Err(ExternalError::Spawn {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(_) => {
                error!(
                    path = %path.display(),
                    op = %op,
                    timeout_secs = self.timeout.as_secs(),
                    "Extension process timed out"
                );
                return Err(ExternalError::Timeout {
                    timeout_seconds: self.timeout.as_secs(),
                });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        let Some(code) = output.status.code() else {
            return Err(ExternalError::Crashed);
        };

        if code != 0 {
            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.is_empty() {
                if !captured.is_empty() {
                    captured.push('\n');
                }
                captured.push_str(&stderr);
            }
            return Err(ExternalError::ExitCode {
                code,
                output: captured.chars().take(MAX_ERROR_OUTPUT).collect(),
            });
        }

        debug!(
            path = %path.display(),
            op = %op,
            duration_ms,
            stdout_bytes = output.stdout.len(),
            "Extension process finished"
        );

        Ok(output.stdout)
    }
}

/// Checks whether `command` resolves on the system `PATH`.
pub async fn command_available(command: &str) -> bool {
    let finder = if cfg!(target_os = "windows") { "where" } else { "which" };

    Command::new(finder)
        .arg(command)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
