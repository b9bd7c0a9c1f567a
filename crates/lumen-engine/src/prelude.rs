//! Prelude for extension authors.

pub use async_trait::async_trait;

pub use crate::closure::FnExtension;
pub use crate::error::ExtensionError;
pub use crate::extension::Extension;
pub use crate::item::{Item, ItemAction, StandardItem};
pub use crate::query::{Match, QueryContext};
