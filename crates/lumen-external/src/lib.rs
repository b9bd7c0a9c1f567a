//! # lumen-external
//!
//! Extensions implemented as executables. Every call runs the executable
//! once with the operation in `LUMEN_OP` and reads a JSON object from its
//! stdout. Variables returned by the executable are kept and passed back
//! in the environment of later calls.

pub mod error;
pub mod extension;
pub mod loader;
pub mod process;
pub mod protocol;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use error::ExternalError;
pub use extension::ExternalExtension;
pub use loader::ExtensionLoader;
pub use process::{Operation, ProcessRunner};
pub use protocol::INTERFACE_ID;
