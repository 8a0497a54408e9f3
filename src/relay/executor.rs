// src/relay/executor.rs

//! Runs one operation and turns its outcome into exactly one reply.

use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::{CommandSpec, ExecutionOutcome, ProcessRunner};
use crate::relay::messages;
use crate::relay::reply::ReplySink;

/// Executes `CommandSpec`s through a `ProcessRunner` and reports back.
#[derive(Debug, Clone)]
pub struct CommandExecutor<R> {
    runner: R,
}

impl<R: ProcessRunner> CommandExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run `spec` and send exactly one reply describing the outcome.
    ///
    /// The outcome is also returned so callers can log or inspect it. An
    /// error means only that the reply could not be delivered; the process
    /// has been cleaned up either way.
    pub async fn execute<S>(&self, spec: &CommandSpec, reply: &S) -> Result<ExecutionOutcome>
    where
        S: ReplySink + ?Sized,
    {
        let outcome = self.runner.run(spec).await;

        match &outcome {
            ExecutionOutcome::Success { .. } => info!(op = %spec.name, "operation succeeded"),
            ExecutionOutcome::Failure { exit_code, .. } => {
                warn!(op = %spec.name, exit_code, "operation failed")
            }
            ExecutionOutcome::Blocked => {
                warn!(op = %spec.name, "operation blocked on interactive credentials")
            }
            ExecutionOutcome::InternalError { message } => {
                warn!(op = %spec.name, error = %message, "operation hit an internal error")
            }
        }

        reply.send_reply(render_outcome(spec, &outcome)).await?;
        Ok(outcome)
    }
}

/// Caller-visible text for an outcome.
pub fn render_outcome(spec: &CommandSpec, outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Success { stdout } => match &spec.success_message {
            Some(msg) => msg.clone(),
            None => messages::success_dump(stdout),
        },
        ExecutionOutcome::Failure { stderr, exit_code } => {
            messages::failure_dump(*exit_code, stderr)
        }
        ExecutionOutcome::Blocked => messages::BLOCKED.to_string(),
        ExecutionOutcome::InternalError { message } => messages::internal_error(message),
    }
}
