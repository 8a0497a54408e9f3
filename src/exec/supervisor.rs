// src/exec/supervisor.rs

//! Supervised execution of a single `CommandSpec`.
//!
//! Per invocation the supervisor runs three things at once: a watcher on
//! stdout, a watcher on stderr, and the wait for the child to exit. The first
//! of {trigger signal, exit, timeout} decides what happens next. Before an
//! outcome is returned the child is reaped, anything left in its process
//! group is stopped, and both watchers have handed back their output.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::exec::handle::ProcessHandle;
use crate::exec::spec::{CommandSpec, ExecutionOutcome};
use crate::exec::watcher::{StreamKind, WatchResult, spawn_watcher, stop_channel};
use crate::types::TimeoutPolicy;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);
pub const DEFAULT_WATCHER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a watcher gets to return its output after being told to stop.
const WATCHER_STOP_TIMEOUT: Duration = Duration::from_millis(250);

/// Whichever happened first while the process was running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceEvent {
    /// A watcher saw the trigger on this stream.
    Triggered(StreamKind),
    /// The process exited on its own. `code` is `None` for signal deaths.
    Exited { code: Option<i32> },
    TimedOut,
    /// Waiting on the child failed at the OS level.
    WaitFailed(String),
}

/// Runs commands to completion and classifies the result.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    /// Time between SIGTERM and SIGKILL.
    pub grace_period: Duration,
    /// How long to wait for watchers once the process is gone.
    pub watcher_join_timeout: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            watcher_join_timeout: DEFAULT_WATCHER_JOIN_TIMEOUT,
        }
    }
}

impl ProcessSupervisor {
    pub fn new(grace_period: Duration, watcher_join_timeout: Duration) -> Self {
        Self {
            grace_period,
            watcher_join_timeout,
        }
    }

    /// Run `spec` and produce exactly one outcome.
    ///
    /// Never returns while the child is still alive; spawn failures map to
    /// `InternalError` without retrying.
    pub async fn supervise(&self, spec: &CommandSpec) -> ExecutionOutcome {
        info!(
            op = %spec.name,
            cmd = %spec.command,
            dir = ?spec.working_dir,
            timeout_ms = spec.timeout.as_millis() as u64,
            "starting supervised process"
        );

        let mut handle = match ProcessHandle::spawn(spec) {
            Ok(h) => h,
            Err(e) => {
                error!(op = %spec.name, error = %e, "failed to spawn process");
                return ExecutionOutcome::internal(format!(
                    "failed to start `{}`: {e}",
                    spec.command
                ));
            }
        };
        let pid = handle.pid();

        let (signal_tx, mut signal_rx) = mpsc::channel::<StreamKind>(2);
        let (stop_tx, stop_rx) = stop_channel();
        let mut watchers: Vec<(StreamKind, JoinHandle<WatchResult>)> = Vec::with_capacity(2);
        if let Some(stdout) = handle.take_stdout() {
            watchers.push((
                StreamKind::Stdout,
                spawn_watcher(
                    stdout,
                    StreamKind::Stdout,
                    spec.trigger.clone(),
                    signal_tx.clone(),
                    stop_rx.clone(),
                ),
            ));
        }
        if let Some(stderr) = handle.take_stderr() {
            watchers.push((
                StreamKind::Stderr,
                spawn_watcher(
                    stderr,
                    StreamKind::Stderr,
                    spec.trigger.clone(),
                    signal_tx.clone(),
                    stop_rx.clone(),
                ),
            ));
        }
        // Only the watchers hold senders now; `recv` yields `None` once both
        // streams hit EOF without a trigger.
        drop(signal_tx);
        drop(stop_rx);

        let deadline = sleep(spec.timeout);
        tokio::pin!(deadline);

        let event = tokio::select! {
            Some(stream) = signal_rx.recv() => RaceEvent::Triggered(stream),
            status = handle.wait() => match status {
                Ok(status) => RaceEvent::Exited { code: status.code() },
                Err(e) => RaceEvent::WaitFailed(e.to_string()),
            },
            _ = &mut deadline => RaceEvent::TimedOut,
        };
        debug!(op = %spec.name, ?pid, ?event, "supervisor race settled");

        if !matches!(event, RaceEvent::Exited { .. }) {
            match handle.terminate(self.grace_period).await {
                Ok(status) => {
                    info!(op = %spec.name, ?pid, exit_code = ?status.code(), "process stopped")
                }
                Err(e) => {
                    error!(op = %spec.name, ?pid, error = %e, "failed to stop process")
                }
            }
        }
        // Background jobs of the child may still hold the pipes open; once
        // they are gone the watchers see EOF with everything captured.
        handle.kill_group(self.grace_period).await;

        let (stdout, stderr) = self.join_watchers(&spec.name, watchers, stop_tx).await;
        let outcome = reconcile(spec.timeout_policy, spec.timeout, &event, &stdout, &stderr);

        info!(
            op = %spec.name,
            ?pid,
            outcome = outcome.kind(),
            "supervised process finished"
        );
        outcome
    }

    /// Join both watchers within `watcher_join_timeout`.
    ///
    /// A watcher still reading at the deadline (the pipe is held open by a
    /// process outside the child's group) is told to stop and returns what it
    /// captured so far. Aborting is the last resort if it does not respond.
    async fn join_watchers(
        &self,
        op: &str,
        watchers: Vec<(StreamKind, JoinHandle<WatchResult>)>,
        stop: tokio::sync::watch::Sender<bool>,
    ) -> (WatchResult, WatchResult) {
        let deadline = Instant::now() + self.watcher_join_timeout;
        let mut stdout = WatchResult::empty(StreamKind::Stdout);
        let mut stderr = WatchResult::empty(StreamKind::Stderr);

        for (kind, mut join) in watchers {
            let joined = match timeout_at(deadline, &mut join).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    warn!(op, stream = %kind, "watcher did not finish in time; stopping it");
                    stop.send_replace(true);
                    timeout(WATCHER_STOP_TIMEOUT, &mut join).await.ok()
                }
            };
            let result = match joined {
                Some(Ok(result)) => result,
                Some(Err(e)) => {
                    warn!(op, stream = %kind, error = %e, "watcher task failed");
                    WatchResult::empty(kind)
                }
                None => {
                    warn!(op, stream = %kind, "watcher ignored stop request; aborting");
                    join.abort();
                    WatchResult::empty(kind)
                }
            };
            match kind {
                StreamKind::Stdout => stdout = result,
                StreamKind::Stderr => stderr = result,
            }
        }

        (stdout, stderr)
    }
}

/// Turn what happened into an outcome.
///
/// A trigger on either stream wins over everything else, including a nonzero
/// exit caused by the prompt itself.
pub fn reconcile(
    policy: TimeoutPolicy,
    limit: Duration,
    event: &RaceEvent,
    stdout: &WatchResult,
    stderr: &WatchResult,
) -> ExecutionOutcome {
    if matches!(event, RaceEvent::Triggered(_)) || stdout.triggered || stderr.triggered {
        return ExecutionOutcome::Blocked;
    }

    match event {
        RaceEvent::Exited { code: Some(0) } => ExecutionOutcome::Success {
            stdout: stdout.text(),
        },
        RaceEvent::Exited { code } => ExecutionOutcome::Failure {
            stderr: stderr.text(),
            exit_code: code.unwrap_or(-1),
        },
        RaceEvent::TimedOut => match policy {
            TimeoutPolicy::Blocked => ExecutionOutcome::Blocked,
            TimeoutPolicy::InternalError => ExecutionOutcome::internal(format!(
                "operation timed out after {}s",
                limit.as_secs_f32()
            )),
        },
        RaceEvent::WaitFailed(msg) => {
            ExecutionOutcome::internal(format!("waiting for process failed: {msg}"))
        }
        RaceEvent::Triggered(_) => ExecutionOutcome::Blocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(kind: StreamKind, text: &str, triggered: bool) -> WatchResult {
        WatchResult {
            stream: kind,
            triggered,
            output: text.as_bytes().to_vec(),
            truncated: false,
        }
    }

    const LIMIT: Duration = Duration::from_secs(30);

    #[test]
    fn late_trigger_beats_nonzero_exit() {
        let out = captured(StreamKind::Stdout, "", false);
        let err = captured(StreamKind::Stderr, "Username for 'x': ", true);
        let outcome = reconcile(
            TimeoutPolicy::InternalError,
            LIMIT,
            &RaceEvent::Exited { code: Some(128) },
            &out,
            &err,
        );
        assert_eq!(outcome, ExecutionOutcome::Blocked);
    }

    #[test]
    fn trigger_beats_clean_exit() {
        let out = captured(StreamKind::Stdout, "Username for", true);
        let err = WatchResult::empty(StreamKind::Stderr);
        let outcome = reconcile(
            TimeoutPolicy::InternalError,
            LIMIT,
            &RaceEvent::Exited { code: Some(0) },
            &out,
            &err,
        );
        assert_eq!(outcome, ExecutionOutcome::Blocked);
    }

    #[test]
    fn exit_codes_map_to_success_and_failure() {
        let out = captured(StreamKind::Stdout, "done\n", false);
        let err = captured(StreamKind::Stderr, "boom\n", false);

        assert_eq!(
            reconcile(TimeoutPolicy::Blocked, LIMIT, &RaceEvent::Exited { code: Some(0) }, &out, &err),
            ExecutionOutcome::Success { stdout: "done\n".into() }
        );
        assert_eq!(
            reconcile(TimeoutPolicy::Blocked, LIMIT, &RaceEvent::Exited { code: Some(2) }, &out, &err),
            ExecutionOutcome::Failure { stderr: "boom\n".into(), exit_code: 2 }
        );
        assert_eq!(
            reconcile(TimeoutPolicy::Blocked, LIMIT, &RaceEvent::Exited { code: None }, &out, &err),
            ExecutionOutcome::Failure { stderr: "boom\n".into(), exit_code: -1 }
        );
    }

    #[test]
    fn timeout_follows_policy() {
        let out = WatchResult::empty(StreamKind::Stdout);
        let err = WatchResult::empty(StreamKind::Stderr);

        assert_eq!(
            reconcile(TimeoutPolicy::Blocked, LIMIT, &RaceEvent::TimedOut, &out, &err),
            ExecutionOutcome::Blocked
        );
        match reconcile(TimeoutPolicy::InternalError, LIMIT, &RaceEvent::TimedOut, &out, &err) {
            ExecutionOutcome::InternalError { message } => {
                assert!(message.contains("timed out"), "{message}")
            }
            other => panic!("expected InternalError, got {other:?}"),
        }
    }
}
