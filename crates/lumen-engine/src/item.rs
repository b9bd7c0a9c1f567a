//! Result items produced by extensions.
//!
//! The engine only needs an item's ranking signals and an activation hook;
//! everything else is passed through to the display adapter via
//! [`DisplayItem`].

use std::fmt;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ActivationError;

/// A result payload returned by an extension.
pub trait Item: Send + Sync + fmt::Debug {
    /// Stable identifier, used as the usage-history key.
    fn id(&self) -> &str;

    /// Primary display text.
    fn text(&self) -> &str;

    /// Secondary display text.
    fn subtext(&self) -> &str {
        ""
    }

    /// Text the input line is replaced with on tab completion.
    fn completion(&self) -> &str {
        self.text()
    }

    /// Icon name or path.
    fn icon(&self) -> Option<&str> {
        None
    }

    /// Importance, e.g. for urgent notifications. Higher ranks first.
    fn importance(&self) -> i32 {
        0
    }

    /// How often the item has been used. Higher ranks first.
    fn usage_count(&self) -> u64 {
        0
    }

    /// Available actions; the first one is the default.
    fn actions(&self) -> &[ItemAction] {
        &[]
    }

    /// Runs the default action.
    fn activate(&self) -> Result<(), ActivationError> {
        let action = self
            .actions()
            .first()
            .ok_or_else(|| ActivationError::NoAction(self.id().to_string()))?;
        action.run()
    }
}

/// An action attached to an item.
#[derive(Clone)]
pub struct ItemAction {
    /// Display name of the action.
    pub name: String,
    kind: ActionKind,
}

#[derive(Clone)]
enum ActionKind {
    Spawn { program: String, arguments: Vec<String> },
    Callback(Arc<dyn Fn() -> Result<(), ActivationError> + Send + Sync>),
}

impl ItemAction {
    /// An action that launches a detached process.
    pub fn spawn(
        name: impl Into<String>,
        program: impl Into<String>,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::Spawn {
                program: program.into(),
                arguments,
            },
        }
    }

    /// An action that runs an in-process callback.
    pub fn callback<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> Result<(), ActivationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ActionKind::Callback(Arc::new(callback)),
        }
    }

    /// Runs the action.
    pub fn run(&self) -> Result<(), ActivationError> {
        match &self.kind {
            ActionKind::Spawn { program, arguments } => {
                let child = Command::new(program)
                    .args(arguments)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| ActivationError::Launch {
                        program: program.clone(),
                        message: e.to_string(),
                    })?;
                info!(action = %self.name, program = %program, pid = child.id(), "Launched action");
                reap(child);
                Ok(())
            }
            ActionKind::Callback(callback) => {
                debug!(action = %self.name, "Running callback action");
                callback()
            }
        }
    }
}

/// Waits for a launched child on a background thread so it never lingers
/// as a zombie.
fn reap(mut child: Child) {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("lumen-reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!(pid, status = %status, "Action process exited"),
            Err(e) => warn!(pid, error = %e, "Failed to wait for action process"),
        });
    if let Err(e) = spawned {
        warn!(pid, error = %e, "Failed to start reaper thread");
    }
}

impl fmt::Debug for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Spawn { program, arguments } => f
                .debug_struct("ItemAction")
                .field("name", &self.name)
                .field("program", program)
                .field("arguments", arguments)
                .finish(),
            ActionKind::Callback(_) => f
                .debug_struct("ItemAction")
                .field("name", &self.name)
                .field("callback", &"<closure>")
                .finish(),
        }
    }
}

/// General purpose [`Item`] implementation.
#[derive(Debug, Clone, Default)]
pub struct StandardItem {
    id: String,
    text: String,
    subtext: String,
    completion: Option<String>,
    icon: Option<String>,
    importance: i32,
    usage_count: u64,
    actions: Vec<ItemAction>,
}

impl StandardItem {
    /// Creates an item with the given id; the text defaults to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            text: id.clone(),
            id,
            ..Self::default()
        }
    }

    /// Sets the display text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the secondary text.
    pub fn with_subtext(mut self, subtext: impl Into<String>) -> Self {
        self.subtext = subtext.into();
        self
    }

    /// Sets the completion string. Empty strings fall back to the text.
    pub fn with_completion(mut self, completion: impl Into<String>) -> Self {
        let completion = completion.into();
        self.completion = (!completion.is_empty()).then_some(completion);
        self
    }

    /// Sets the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        let icon = icon.into();
        self.icon = (!icon.is_empty()).then_some(icon);
        self
    }

    /// Sets the importance.
    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    /// Sets the usage count, usually read from the usage history.
    pub fn with_usage_count(mut self, usage_count: u64) -> Self {
        self.usage_count = usage_count;
        self
    }

    /// Appends an action.
    pub fn with_action(mut self, action: ItemAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Replaces all actions.
    pub fn with_actions(mut self, actions: Vec<ItemAction>) -> Self {
        self.actions = actions;
        self
    }
}

impl Item for StandardItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn subtext(&self) -> &str {
        &self.subtext
    }

    fn completion(&self) -> &str {
        self.completion.as_deref().unwrap_or(&self.text)
    }

    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    fn importance(&self) -> i32 {
        self.importance
    }

    fn usage_count(&self) -> u64 {
        self.usage_count
    }

    fn actions(&self) -> &[ItemAction] {
        &self.actions
    }
}

/// Serializable projection of an item handed to the display adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayItem {
    /// Item id.
    pub id: String,
    /// Primary text.
    pub text: String,
    /// Secondary text.
    pub subtext: String,
    /// Completion string.
    pub completion: String,
    /// Icon name or path.
    pub icon: Option<String>,
    /// Importance signal.
    pub importance: i32,
    /// Usage signal.
    pub usage_count: u64,
    /// Provider score.
    pub score: f64,
    /// Names of the available actions.
    pub actions: Vec<String>,
}
