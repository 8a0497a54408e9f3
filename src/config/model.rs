// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::ProcessSupervisor;
use crate::relay::{AllowList, Operation, UserId};
use crate::types::{CommandLine, TimeoutPolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// allowed_user_ids = [123456789]
/// repo_path = "/srv/app"
/// grace_period = "2s"
///
/// [operation.pull]
/// timeout = "45s"
/// trigger = "Username for"
/// on_timeout = "blocked"
///
/// [operation.restart]
/// cmd = "systemctl restart api"
/// ```
///
/// Every section is optional; `pull`, `pushdb` and `restart` have built-in
/// defaults which `[operation.<name>]` fields override one by one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are operation names (`"pull"`, `"pushdb"`, `"restart"`).
    #[serde(default)]
    pub operation: BTreeMap<String, OperationConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Callers allowed to run anything. Must not be empty.
    #[serde(default)]
    pub allowed_user_ids: Vec<UserId>,

    /// Repository the `pull` and `pushdb` operations run in.
    #[serde(default)]
    pub repo_path: Option<PathBuf>,

    /// Time between the polite termination signal and the hard kill.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    /// Bound on waiting for output watchers after the process is gone.
    #[serde(default = "default_watcher_join_timeout")]
    pub watcher_join_timeout: String,
}

fn default_grace_period() -> String {
    "2s".to_string()
}

fn default_watcher_join_timeout() -> String {
    "2s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            allowed_user_ids: Vec::new(),
            repo_path: None,
            grace_period: default_grace_period(),
            watcher_join_timeout: default_watcher_join_timeout(),
        }
    }
}

/// `[operation.<name>]` section. Every field falls back to the built-in
/// default for that operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationConfig {
    /// Argument vector (`["git", "pull"]`) or shell string.
    #[serde(default)]
    pub cmd: Option<CommandLine>,

    /// Explicit working directory; takes precedence over `use_repo_path`.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Run inside `[config].repo_path`.
    #[serde(default)]
    pub use_repo_path: Option<bool>,

    /// Duration string such as `"30s"`.
    #[serde(default)]
    pub timeout: Option<String>,

    /// Output fragment that marks a credential prompt.
    #[serde(default)]
    pub trigger: Option<String>,

    /// `"blocked"` or `"internal_error"`.
    #[serde(default)]
    pub on_timeout: Option<TimeoutPolicy>,

    #[serde(default)]
    pub starting_message: Option<String>,

    #[serde(default)]
    pub success_message: Option<String>,
}

/// Validated configuration, ready to build a router from.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    allow_list: AllowList,
    repo_path: Option<PathBuf>,
    supervisor: ProcessSupervisor,
    operations: Vec<Operation>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        allow_list: AllowList,
        repo_path: Option<PathBuf>,
        supervisor: ProcessSupervisor,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            allow_list,
            repo_path,
            supervisor,
            operations,
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn repo_path(&self) -> Option<&PathBuf> {
        self.repo_path.as_ref()
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}
