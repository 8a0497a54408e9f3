// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What a bare timeout means for an operation.
///
/// A timeout here is "the process neither exited nor printed the credential
/// trigger before the deadline".
///
/// - `Blocked`: report the operation as blocked on interactive credentials.
///   This is the right call for network operations such as `git pull`, where a
///   silent hang almost always means a prompt waiting on a closed stdin.
/// - `InternalError`: report a plain "operation timed out" fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    Blocked,
    InternalError,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy::InternalError
    }
}

impl FromStr for TimeoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blocked" => Ok(TimeoutPolicy::Blocked),
            "internal_error" => Ok(TimeoutPolicy::InternalError),
            other => Err(format!(
                "invalid on_timeout: {other} (expected \"blocked\" or \"internal_error\")"
            )),
        }
    }
}

/// A command as written in config: either an argument vector run directly,
/// or a single string handed to the platform shell.
///
/// ```toml
/// cmd = ["git", "pull"]               # Argv
/// cmd = "systemctl restart backend"   # Shell
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Argv(Vec<String>),
    Shell(String),
}

impl CommandLine {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn shell(cmd: impl Into<String>) -> Self {
        CommandLine::Shell(cmd.into())
    }

    /// True if there is nothing to run.
    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Argv(args) => args.first().is_none_or(|p| p.trim().is_empty()),
            CommandLine::Shell(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Argv(args) => write!(f, "{}", args.join(" ")),
            CommandLine::Shell(s) => write!(f, "{s}"),
        }
    }
}

/// Parse a simple duration string like `"30s"`, `"250ms"`, `"3m"`, `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
