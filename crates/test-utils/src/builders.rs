#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use relaybot::config::{ConfigFile, OperationConfig, RawConfigFile};
use relaybot::exec::CommandSpec;
use relaybot::types::{CommandLine, TimeoutPolicy};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn allow_user(mut self, id: i64) -> Self {
        self.config.config.allowed_user_ids.push(id);
        self
    }

    pub fn repo_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.config.repo_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn grace_period(mut self, dur: &str) -> Self {
        self.config.config.grace_period = dur.to_string();
        self
    }

    pub fn with_operation(mut self, name: &str, op: OperationConfig) -> Self {
        self.config.operation.insert(name.to_string(), op);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `OperationConfig` overrides.
#[derive(Default)]
pub struct OperationConfigBuilder {
    op: OperationConfig,
}

impl OperationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shell(mut self, script: &str) -> Self {
        self.op.cmd = Some(CommandLine::shell(script));
        self
    }

    pub fn timeout(mut self, dur: &str) -> Self {
        self.op.timeout = Some(dur.to_string());
        self
    }

    pub fn on_timeout(mut self, policy: TimeoutPolicy) -> Self {
        self.op.on_timeout = Some(policy);
        self
    }

    pub fn build(self) -> OperationConfig {
        self.op
    }
}

/// A `sh -c` spec with the default credential trigger.
pub fn sh_spec(name: &str, script: &str, timeout: Duration) -> CommandSpec {
    CommandSpec::new(name, CommandLine::shell(script), timeout).with_trigger("Username for")
}
