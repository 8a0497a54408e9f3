// src/config/mod.rs

//! Configuration loading and validation for relaybot.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Provide the built-in operations (`defaults.rs`).
//! - Load a config file from disk and apply env overrides (`loader.rs`).
//! - Validate and resolve operations into `CommandSpec`s (`validate.rs`).

pub mod defaults;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_and_validate_with_env, load_from_path};
pub use model::{ConfigFile, ConfigSection, OperationConfig, RawConfigFile};
pub use validate::validate_config;
