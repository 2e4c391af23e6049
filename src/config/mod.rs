// src/config/mod.rs

//! Task file loading and validation.
//!
//! - [`model`] is the TOML-backed data model, including the executor settings.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns a `RawConfigFile` into a checked `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, ExecutorConfig, RawConfigFile, TaskConfig};
