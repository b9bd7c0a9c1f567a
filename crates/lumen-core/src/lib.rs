//! # lumen-core
//!
//! Core crate for the Lumen launcher. Contains the configuration schemas
//! and the unified error system shared by the engine, the external
//! extension host and the binaries.
//!
//! This crate has **no** internal dependencies on other Lumen crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
