// src/relay/router.rs

//! Dispatch table from command names to operations, behind the
//! authorization gate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::errors::{RelayError, Result};
use crate::exec::{CommandSpec, ExecutionOutcome, ProcessRunner};
use crate::relay::executor::CommandExecutor;
use crate::relay::messages;
use crate::relay::reply::{Authorizer, ReplySink};
use crate::relay::UserId;

/// Commands the relay understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelayCommand {
    Start,
    Pull,
    PushDb,
    Restart,
}

impl RelayCommand {
    /// Commands that run a process.
    pub const OPERATIONS: [RelayCommand; 3] =
        [RelayCommand::Pull, RelayCommand::PushDb, RelayCommand::Restart];

    pub fn name(self) -> &'static str {
        match self {
            RelayCommand::Start => "start",
            RelayCommand::Pull => "pull",
            RelayCommand::PushDb => "pushdb",
            RelayCommand::Restart => "restart",
        }
    }
}

impl fmt::Display for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelayCommand {
    type Err = RelayError;

    /// Accepts `pull`, `/pull` and chat-style `/pull@somebot`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('/').unwrap_or(s);
        let s = s.split('@').next().unwrap_or(s);
        match s.to_lowercase().as_str() {
            "start" => Ok(RelayCommand::Start),
            "pull" => Ok(RelayCommand::Pull),
            "pushdb" => Ok(RelayCommand::PushDb),
            "restart" => Ok(RelayCommand::Restart),
            other => Err(RelayError::UnknownOperation(other.to_string())),
        }
    }
}

/// A registered operation: acknowledgement text plus what to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub command: RelayCommand,
    pub starting_message: String,
    pub spec: CommandSpec,
}

/// How a dispatch ended, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Caller not on the allow-list; one refusal sent, nothing spawned.
    Refused,
    Greeted,
    Executed(ExecutionOutcome),
    Unknown,
}

/// Routes inbound commands to operations.
///
/// Operations are independent of each other: two dispatches can run at the
/// same time and nothing here serializes them.
pub struct CommandRouter<R, A> {
    operations: BTreeMap<RelayCommand, Operation>,
    authorizer: A,
    executor: CommandExecutor<R>,
}

impl<R, A> fmt::Debug for CommandRouter<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<R: ProcessRunner, A: Authorizer> CommandRouter<R, A> {
    pub fn new(operations: impl IntoIterator<Item = Operation>, authorizer: A, runner: R) -> Self {
        Self {
            operations: operations.into_iter().map(|op| (op.command, op)).collect(),
            authorizer,
            executor: CommandExecutor::new(runner),
        }
    }

    pub fn operation(&self, command: RelayCommand) -> Option<&Operation> {
        self.operations.get(&command)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Handle one inbound command from `user_id`.
    ///
    /// Unauthorized callers get a single refusal and no process is started.
    /// Authorized operations get an acknowledgement followed by exactly one
    /// outcome reply.
    pub async fn dispatch<S>(&self, user_id: UserId, input: &str, reply: &S) -> Result<Dispatch>
    where
        S: ReplySink + ?Sized,
    {
        let command = match input.parse::<RelayCommand>() {
            Ok(c) => c,
            Err(_) => {
                debug!(user_id, input, "unknown command");
                reply.send_reply(messages::unknown_command(input.trim())).await?;
                return Ok(Dispatch::Unknown);
            }
        };

        let authorized = self.authorizer.is_authorized(user_id);

        if command == RelayCommand::Start {
            let text = if authorized {
                messages::GREETING
            } else {
                messages::START_REFUSAL
            };
            reply.send_reply(text.to_string()).await?;
            return Ok(if authorized {
                Dispatch::Greeted
            } else {
                Dispatch::Refused
            });
        }

        if !authorized {
            warn!(user_id, op = %command, "unauthorized caller; refusing");
            reply.send_reply(messages::REFUSAL.to_string()).await?;
            return Ok(Dispatch::Refused);
        }

        let Some(op) = self.operations.get(&command) else {
            warn!(user_id, op = %command, "no operation registered for command");
            reply.send_reply(messages::unknown_command(input.trim())).await?;
            return Ok(Dispatch::Unknown);
        };

        info!(user_id, op = %command, "dispatching operation");
        reply.send_reply(op.starting_message.clone()).await?;
        let outcome = self.executor.execute(&op.spec, reply).await?;
        Ok(Dispatch::Executed(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_style_commands() {
        assert_eq!("/pull".parse::<RelayCommand>().unwrap(), RelayCommand::Pull);
        assert_eq!("pushdb".parse::<RelayCommand>().unwrap(), RelayCommand::PushDb);
        assert_eq!("/Restart@relay_bot".parse::<RelayCommand>().unwrap(), RelayCommand::Restart);
        assert_eq!(" /start ".parse::<RelayCommand>().unwrap(), RelayCommand::Start);
        assert!("/deploy".parse::<RelayCommand>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for c in RelayCommand::OPERATIONS {
            assert_eq!(c.name().parse::<RelayCommand>().unwrap(), c);
        }
    }
}
