// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RelayError, Result};

/// Env var holding a comma-separated allow-list; replaces
/// `[config].allowed_user_ids` when set.
pub const ENV_ALLOWED_USER_IDS: &str = "RELAYBOT_ALLOWED_USER_IDS";

/// Env var overriding `[config].repo_path`.
pub const ENV_REPO_PATH: &str = "RELAYBOT_REPO_PATH";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate or
/// resolve operations. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Blank values are ignored so an empty `RELAYBOT_REPO_PATH=` does not wipe
/// out the file setting.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ids) = lookup(ENV_ALLOWED_USER_IDS).filter(|v| !v.trim().is_empty()) {
        raw.config.allowed_user_ids = parse_user_ids(&ids)?;
        debug!(count = raw.config.allowed_user_ids.len(), "allow-list taken from environment");
    }

    if let Some(path) = lookup(ENV_REPO_PATH).filter(|v| !v.trim().is_empty()) {
        debug!(repo_path = %path, "repo_path taken from environment");
        raw.config.repo_path = Some(PathBuf::from(path.trim()));
    }

    Ok(())
}

/// Parse `"123, 456"` into ids, skipping empty entries.
pub fn parse_user_ids(s: &str) -> Result<Vec<i64>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|e| {
                RelayError::ConfigError(format!(
                    "{ENV_ALLOWED_USER_IDS}: invalid user id '{part}': {e}"
                ))
            })
        })
        .collect()
}

/// Load a configuration file, apply environment overrides and validate.
///
/// This is the recommended entry point for the rest of the application.
/// When `path` does not exist and `allow_missing` is set, the relay starts
/// from built-in defaults and relies on the environment for the allow-list.
pub fn load_and_validate(path: impl AsRef<Path>, allow_missing: bool) -> Result<ConfigFile> {
    load_and_validate_with_env(path, allow_missing, |key| std::env::var(key).ok())
}

/// [`load_and_validate`] with an injectable environment.
pub fn load_and_validate_with_env<F>(
    path: impl AsRef<Path>,
    allow_missing: bool,
    lookup: F,
) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let mut raw = if allow_missing && !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        RawConfigFile::default()
    } else {
        load_from_path(path)?
    };

    apply_env_overrides(&mut raw, lookup)?;
    ConfigFile::try_from(raw)
}

/// Default config path: `Relaybot.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Relaybot.toml")
}
