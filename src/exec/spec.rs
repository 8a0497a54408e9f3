// src/exec/spec.rs

//! What to run, and what came of running it.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::{CommandLine, TimeoutPolicy};

/// Fully resolved description of one registered operation.
///
/// Built once at startup from config and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Operation name (`pull`, `pushdb`, ...); used for logging only.
    pub name: String,
    pub command: CommandLine,
    /// Working directory for the child. Passed per spawn; the relay never
    /// changes its own working directory.
    pub working_dir: Option<PathBuf>,
    /// Fixed reply on success. If `None`, captured stdout is echoed back.
    pub success_message: Option<String>,
    pub timeout: Duration,
    /// Output fragment meaning "the process is prompting for credentials".
    pub trigger: Option<String>,
    pub timeout_policy: TimeoutPolicy,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, command: CommandLine, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            command,
            working_dir: None,
            success_message: None,
            timeout,
            trigger: None,
            timeout_policy: TimeoutPolicy::default(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_success_message(mut self, msg: impl Into<String>) -> Self {
        self.success_message = Some(msg.into());
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }
}

/// Terminal classification of one supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Exited 0 without printing the trigger.
    Success { stdout: String },
    /// Exited nonzero without printing the trigger. `exit_code` is `-1` when
    /// the process died from a signal.
    Failure { stderr: String, exit_code: i32 },
    /// Waiting on interactive credentials (trigger seen, or a timeout under
    /// `TimeoutPolicy::Blocked`).
    Blocked,
    /// Spawn failure, wait failure, or a timeout under
    /// `TimeoutPolicy::InternalError`.
    InternalError { message: String },
}

impl ExecutionOutcome {
    pub fn internal(message: impl Into<String>) -> Self {
        ExecutionOutcome::InternalError {
            message: message.into(),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success { .. } => "success",
            ExecutionOutcome::Failure { .. } => "failure",
            ExecutionOutcome::Blocked => "blocked",
            ExecutionOutcome::InternalError { .. } => "internal_error",
        }
    }
}
