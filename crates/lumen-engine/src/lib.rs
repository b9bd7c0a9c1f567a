//! # lumen-engine
//!
//! Query dispatch engine for the Lumen launcher. Provides:
//!
//! - Extension contract with trigger, exclusive and fallback routing
//! - Copy-on-write extension registry
//! - Concurrent dispatcher with per-call timeouts and fault isolation
//! - Stable multi-key ranking of merged matches
//! - Session lifecycle hooks
//! - A launcher engine that cancels superseded queries before they publish

pub mod closure;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod extension;
pub mod history;
pub mod item;
pub mod prelude;
pub mod query;
pub mod ranker;
pub mod registry;
pub mod session;
pub mod sink;

pub use closure::FnExtension;
pub use dispatcher::Dispatcher;
pub use engine::LauncherEngine;
pub use error::{ActivationError, EmptyTerm, ExtensionError, RegistryError};
pub use extension::{Extension, ExtensionInfo};
pub use history::{UsageHistory, UsageRecord};
pub use item::{DisplayItem, Item, ItemAction, StandardItem};
pub use query::{DispatchOutcome, Match, Query, QueryContext, QueryState};
pub use registry::{ExtensionRegistry, ExtensionSnapshot};
pub use session::{SessionManager, SessionReport};
pub use sink::{ChannelSink, NullSink, ResultSet, ResultSink};
