// src/config/defaults.rs

//! Built-in operation definitions.

use std::time::Duration;

use crate::relay::RelayCommand;
use crate::types::{CommandLine, TimeoutPolicy};

/// Prompt git prints when it wants HTTPS credentials.
pub const DEFAULT_TRIGGER: &str = "Username for";

/// Defaults for one operation before `[operation.<name>]` overrides.
#[derive(Debug, Clone)]
pub struct OperationDefaults {
    pub cmd: CommandLine,
    pub use_repo_path: bool,
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
    pub starting_message: &'static str,
    pub success_message: &'static str,
}

/// Defaults for a process-running command; `None` for `start`.
pub fn builtin(command: RelayCommand) -> Option<OperationDefaults> {
    match command {
        RelayCommand::Start => None,
        // A silent hang in `git pull` is almost always a credential prompt.
        RelayCommand::Pull => Some(OperationDefaults {
            cmd: CommandLine::argv(["git", "pull"]),
            use_repo_path: true,
            timeout: Duration::from_secs(30),
            on_timeout: TimeoutPolicy::Blocked,
            starting_message: "Running git pull...",
            success_message: "Git pull completed successfully!",
        }),
        RelayCommand::PushDb => Some(OperationDefaults {
            cmd: CommandLine::argv(["npx", "prisma", "db", "push"]),
            use_repo_path: true,
            timeout: Duration::from_secs(60),
            on_timeout: TimeoutPolicy::InternalError,
            starting_message: "Running npx prisma db push...",
            success_message: "Database schema updated with prisma db push!",
        }),
        RelayCommand::Restart => Some(OperationDefaults {
            cmd: CommandLine::shell("systemctl restart backend"),
            use_repo_path: false,
            timeout: Duration::from_secs(180),
            on_timeout: TimeoutPolicy::InternalError,
            starting_message: "Restarting backend service...",
            success_message: "Backend service restarted!",
        }),
    }
}
