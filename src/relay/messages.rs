// src/relay/messages.rs

//! Fixed reply texts.

pub const GREETING: &str = "Relay is online. Available commands: /pull, /pushdb, /restart";

/// Reply to `/start` from someone not on the allow-list.
pub const START_REFUSAL: &str = "Who are you?";

pub const REFUSAL: &str = "Sorry, you are not permitted to use this bot.";

pub const BLOCKED: &str = "This operation requires interactive credentials \
(the target prompted for a username/password) and cannot be run remotely. \
Configure non-interactive credentials on the host and try again.";

pub fn success_dump(stdout: &str) -> String {
    format!("Command completed successfully:\n\n```\n{}\n```", stdout.trim_end())
}

pub fn failure_dump(exit_code: i32, stderr: &str) -> String {
    format!(
        "Command failed (exit code {exit_code}):\n\n```\n{}\n```",
        stderr.trim_end()
    )
}

pub fn internal_error(message: &str) -> String {
    format!("Internal error: {message}")
}

pub fn unknown_command(input: &str) -> String {
    format!("Unknown command: {input}")
}
