// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::defaults::{self, DEFAULT_TRIGGER};
use crate::config::model::{ConfigFile, OperationConfig, RawConfigFile};
use crate::errors::{RelayError, Result};
use crate::exec::{CommandSpec, ProcessSupervisor};
use crate::relay::{AllowList, Operation, RelayCommand};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RelayError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;

        let supervisor = ProcessSupervisor::new(
            parse_positive("[config].grace_period", &raw.config.grace_period)?,
            parse_positive("[config].watcher_join_timeout", &raw.config.watcher_join_timeout)?,
        );

        let mut operations = Vec::with_capacity(RelayCommand::OPERATIONS.len());
        for command in RelayCommand::OPERATIONS {
            let overrides = raw.operation.get(command.name()).cloned().unwrap_or_default();
            operations.push(resolve_operation(command, &overrides, raw.config.repo_path.as_ref())?);
        }

        Ok(ConfigFile::new_unchecked(
            AllowList::new(raw.config.allowed_user_ids.iter().copied()),
            raw.config.repo_path,
            supervisor,
            operations,
        ))
    }
}

/// Check the raw config for problems that don't need resolution.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_allowed_users(cfg)?;
    validate_operation_names(cfg)?;
    Ok(())
}

fn ensure_has_allowed_users(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.allowed_user_ids.is_empty() {
        return Err(RelayError::ConfigError(
            "[config].allowed_user_ids must list at least one user id".to_string(),
        ));
    }
    Ok(())
}

fn validate_operation_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.operation.keys() {
        let known = RelayCommand::OPERATIONS.iter().any(|c| c.name() == name);
        if !known {
            return Err(RelayError::ConfigError(format!(
                "unknown operation '{}' (expected one of: pull, pushdb, restart)",
                name
            )));
        }
    }
    Ok(())
}

fn parse_positive(field: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value)
        .map_err(|e| RelayError::ConfigError(format!("{field}: {e}")))?;
    if dur.is_zero() {
        return Err(RelayError::ConfigError(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(dur)
}

/// Merge `[operation.<name>]` over the built-in defaults.
fn resolve_operation(
    command: RelayCommand,
    overrides: &OperationConfig,
    repo_path: Option<&PathBuf>,
) -> Result<Operation> {
    let name = command.name();
    let base = defaults::builtin(command).ok_or_else(|| {
        RelayError::ConfigError(format!("'{name}' does not run a command"))
    })?;

    let cmd = overrides.cmd.clone().unwrap_or(base.cmd);
    if cmd.is_empty() {
        return Err(RelayError::ConfigError(format!(
            "[operation.{name}].cmd must not be empty"
        )));
    }

    let timeout = match &overrides.timeout {
        Some(s) => parse_positive(&format!("[operation.{name}].timeout"), s)?,
        None => base.timeout,
    };

    let trigger = overrides
        .trigger
        .clone()
        .unwrap_or_else(|| DEFAULT_TRIGGER.to_string());
    if trigger.is_empty() {
        return Err(RelayError::ConfigError(format!(
            "[operation.{name}].trigger must not be empty"
        )));
    }

    let working_dir = match &overrides.working_dir {
        Some(dir) => Some(dir.clone()),
        None if overrides.use_repo_path.unwrap_or(base.use_repo_path) => {
            let repo = repo_path.ok_or_else(|| {
                RelayError::ConfigError(format!(
                    "operation '{name}' runs in the repository but [config].repo_path is not set"
                ))
            })?;
            Some(repo.clone())
        }
        None => None,
    };

    let mut spec = CommandSpec::new(name, cmd, timeout)
        .with_trigger(trigger)
        .with_timeout_policy(overrides.on_timeout.unwrap_or(base.on_timeout));
    spec.working_dir = working_dir;
    // An explicit empty success message means "echo stdout back".
    spec.success_message = match &overrides.success_message {
        Some(msg) if msg.is_empty() => None,
        Some(msg) => Some(msg.clone()),
        None => Some(base.success_message.to_string()),
    };

    Ok(Operation {
        command,
        starting_message: overrides
            .starting_message
            .clone()
            .unwrap_or_else(|| base.starting_message.to_string()),
        spec,
    })
}
