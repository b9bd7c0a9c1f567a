//! Session manager. Toggles extensions between active and inactive.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lumen_core::config::session::SessionConfig;

use crate::error::ExtensionError;
use crate::registry::ExtensionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Setup,
    Teardown,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup_session"),
            Self::Teardown => write!(f, "teardown_session"),
        }
    }
}

/// Outcome of a [`SessionManager::set_active`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// State after the call.
    pub active: bool,
    /// Whether the call was a transition.
    pub changed: bool,
    /// Id of the session that was started or ended.
    pub session_id: Option<Uuid>,
    /// Extensions whose hook succeeded.
    pub succeeded: usize,
    /// Ids of extensions whose hook failed, timed out or panicked.
    pub failed: Vec<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    active: bool,
    session_id: Option<Uuid>,
}

/// Runs the session hooks of every registered extension on transitions.
#[derive(Debug)]
pub struct SessionManager {
    registry: Arc<ExtensionRegistry>,
    hook_timeout: Duration,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Creates an inactive session manager.
    pub fn new(registry: Arc<ExtensionRegistry>, config: &SessionConfig) -> Self {
        Self {
            registry,
            hook_timeout: config.hook_timeout(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Whether a session is active.
    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    /// Id of the active session.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.state.lock().await.session_id
    }

    /// Activates or deactivates the session.
    ///
    /// Only transitions run hooks. Hooks run concurrently; a failing hook is
    /// logged and does not stop the others.
    pub async fn set_active(&self, active: bool) -> SessionReport {
        let mut state = self.state.lock().await;

        if state.active == active {
            debug!(active, "Session already in requested state");
            return SessionReport {
                active,
                changed: false,
                session_id: state.session_id,
                ..SessionReport::default()
            };
        }

        let (hook, session_id) = if active {
            (Hook::Setup, Uuid::new_v4())
        } else {
            (Hook::Teardown, state.session_id.unwrap_or_else(Uuid::nil))
        };

        let (succeeded, failed) = self.run_hooks(hook, session_id).await;

        state.active = active;
        state.session_id = active.then_some(session_id);

        info!(
            session_id = %session_id,
            active,
            succeeded,
            failed = failed.len(),
            "Session {}",
            if active { "started" } else { "ended" }
        );

        SessionReport {
            active,
            changed: true,
            session_id: Some(session_id),
            succeeded,
            failed,
        }
    }

    async fn run_hooks(&self, hook: Hook, session_id: Uuid) -> (usize, Vec<String>) {
        let extensions = self.registry.snapshot().await;
        let timeout = self.hook_timeout;

        let handles: Vec<_> = extensions
            .iter()
            .cloned()
            .map(|extension| {
                tokio::spawn(async move {
                    let call = async {
                        match hook {
                            Hook::Setup => extension.setup_session().await,
                            Hook::Teardown => extension.teardown_session().await,
                        }
                    };
                    match tokio::time::timeout(timeout, call).await {
                        Ok(result) => result,
                        Err(_) => Err(ExtensionError::Timeout {
                            extension: extension.id().to_string(),
                            timeout,
                        }),
                    }
                })
            })
            .collect();

        let mut succeeded = 0;
        let mut failed = Vec::new();

        for (extension, joined) in extensions.iter().zip(join_all(handles).await) {
            let error = match joined {
                Ok(Ok(())) => {
                    succeeded += 1;
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(join_err) => format!("hook task failed: {join_err}"),
            };

            warn!(
                session_id = %session_id,
                extension_id = %extension.id(),
                hook = %hook,
                error = %error,
                "Session hook failed"
            );
            failed.push(extension.id().to_string());
        }

        (succeeded, failed)
    }
}
