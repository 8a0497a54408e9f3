// src/exec/handle.rs

//! Owned handle to a live child process.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::exec::spec::CommandSpec;
use crate::types::CommandLine;

/// Signals the handle knows how to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Terminate,
    Kill,
}

/// How often `kill_group` checks whether the group has emptied.
#[cfg(unix)]
const GROUP_POLL: Duration = Duration::from_millis(25);

/// A spawned child plus its cached exit status.
///
/// The handle is the only owner of the child. It is always driven to a reaped
/// state by either [`ProcessHandle::wait`] or [`ProcessHandle::terminate`];
/// `kill_on_drop` covers the remaining panic/cancellation paths.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    status: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawn the command described by `spec` with piped stdout/stderr and a
    /// null stdin, so a credential prompt can never read an answer.
    pub fn spawn(spec: &CommandSpec) -> io::Result<Self> {
        let mut cmd = build_command(spec)?;
        let child = cmd.spawn()?;
        let pid = child.id();
        debug!(op = %spec.name, ?pid, "process spawned");
        Ok(Self {
            child,
            pid,
            status: None,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Exit status, if the process has already been reaped.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Wait for the process to exit and reap it.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.status = Some(status);
        Ok(status)
    }

    /// Non-blocking reap attempt.
    pub fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status)
    }

    /// Stop the process: polite signal, `grace` to comply, then a hard kill,
    /// then reap.
    ///
    /// Idempotent: on an already-exited process this only returns the cached
    /// status.
    pub async fn terminate(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.try_reap()? {
            debug!(pid = ?self.pid, "process already exited; nothing to terminate");
            return Ok(status);
        }

        info!(pid = ?self.pid, "terminating process");
        self.send(Signal::Terminate);

        if let Ok(res) = timeout(grace, self.child.wait()).await {
            let status = res?;
            self.status = Some(status);
            return Ok(status);
        }

        warn!(
            pid = ?self.pid,
            grace_ms = grace.as_millis() as u64,
            "process ignored termination request; killing"
        );
        self.send(Signal::Kill);
        if let Err(e) = self.child.start_kill() {
            // Already gone between the signal and here.
            debug!(pid = ?self.pid, error = %e, "start_kill failed");
        }

        let status = self.child.wait().await?;
        self.status = Some(status);
        Ok(status)
    }

    /// Stop whatever is left of the child's process group after the child
    /// itself has been reaped, e.g. background jobs of an `sh -c` wrapper.
    ///
    /// SIGTERM to the group, up to `grace` for it to empty, then SIGKILL. A
    /// group that is already empty costs one failed `kill(2)`. The group id
    /// stays reserved while any member is alive, so this cannot hit an
    /// unrelated group.
    #[cfg(unix)]
    pub async fn kill_group(&mut self, grace: Duration) {
        let Some(pid) = self.pid else {
            return;
        };
        if self.status.is_none() {
            debug!(pid, "child not reaped yet; use terminate instead");
            return;
        }
        if signal_group(pid, libc::SIGTERM).is_err() {
            return;
        }

        info!(pid, "stopping leftover members of the process group");
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            sleep(GROUP_POLL).await;
            if signal_group(pid, 0).is_err() {
                return;
            }
        }

        warn!(
            pid,
            grace_ms = grace.as_millis() as u64,
            "process group ignored termination request; killing"
        );
        if let Err(e) = signal_group(pid, libc::SIGKILL) {
            debug!(pid, error = %e, "killing process group failed");
        }
    }

    #[cfg(not(unix))]
    pub async fn kill_group(&mut self, _grace: Duration) {}

    /// Deliver `sig` to the child's whole process group, so shell wrappers do
    /// not leave their children behind.
    ///
    /// Only called while the child is unreaped, which keeps the group id
    /// reserved.
    #[cfg(unix)]
    fn send(&mut self, sig: Signal) {
        let Some(pid) = self.pid else {
            return;
        };
        let signo = match sig {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };
        if let Err(e) = signal_group(pid, signo) {
            debug!(pid, ?sig, error = %e, "signalling process group failed");
        }
    }

    #[cfg(not(unix))]
    fn send(&mut self, sig: Signal) {
        if let Err(e) = self.child.start_kill() {
            debug!(pid = ?self.pid, ?sig, error = %e, "start_kill failed");
        }
    }
}

/// `kill(-pgid, signo)`; signal 0 only probes whether the group has members.
#[cfg(unix)]
fn signal_group(pgid: u32, signo: libc::c_int) -> io::Result<()> {
    // SAFETY: plain kill(2); a negative pid addresses the process group
    // created for the child at spawn time.
    let rc = unsafe { libc::kill(-(pgid as libc::pid_t), signo) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Build the `Command` for a spec.
fn build_command(spec: &CommandSpec) -> io::Result<Command> {
    let mut cmd = match &spec.command {
        CommandLine::Argv(args) => {
            let (program, rest) = args.split_first().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector")
            })?;
            let mut c = Command::new(program);
            c.args(rest);
            c
        }
        // Build a shell command appropriate for the platform.
        CommandLine::Shell(line) => {
            if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(line);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(line);
                c
            }
        }
    };

    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    Ok(cmd)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("test", CommandLine::shell(script), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn terminate_after_exit_is_a_noop() {
        let mut handle = ProcessHandle::spawn(&sh("exit 3")).unwrap();
        let first = handle.wait().await.unwrap();
        assert_eq!(first.code(), Some(3));

        let again = handle.terminate(Duration::from_millis(50)).await.unwrap();
        assert_eq!(again, first);
        let third = handle.terminate(Duration::from_millis(50)).await.unwrap();
        assert_eq!(third, first);
    }

    #[tokio::test]
    async fn terminate_stops_a_sleeping_process() {
        let mut handle = ProcessHandle::spawn(&sh("sleep 30")).unwrap();
        let status = handle.terminate(Duration::from_millis(500)).await.unwrap();
        assert!(!status.success());
        assert_eq!(handle.exit_status(), Some(status));
    }

    #[tokio::test]
    async fn terminate_escalates_when_sigterm_is_ignored() {
        let mut handle = ProcessHandle::spawn(&sh("trap '' TERM; sleep 30")).unwrap();
        // Give the shell a moment to install the trap.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = timeout(
            Duration::from_secs(5),
            handle.terminate(Duration::from_millis(200)),
        )
        .await
        .expect("terminate must not hang")
        .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn kill_group_after_exit_with_empty_group_returns_immediately() {
        let mut handle = ProcessHandle::spawn(&sh("exit 0")).unwrap();
        handle.wait().await.unwrap();

        timeout(Duration::from_secs(1), handle.kill_group(Duration::from_secs(5)))
            .await
            .expect("empty group must not wait out the grace period");
    }

    /// Alive and not a zombie. Without procfs only existence is checked.
    fn running(pid: i32) -> bool {
        // SAFETY: signal 0 only checks for existence/permission.
        if unsafe { libc::kill(pid, 0) } != 0 {
            return false;
        }
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => true,
        }
    }

    #[tokio::test]
    async fn kill_group_stops_background_job_of_exited_shell() {
        use tokio::io::{AsyncBufReadExt, BufReader};

        let mut handle = ProcessHandle::spawn(&sh("sleep 30 & echo $!; exit 0")).unwrap();
        let mut stdout = BufReader::new(handle.take_stdout().unwrap());
        let mut line = String::new();
        stdout.read_line(&mut line).await.unwrap();
        let bg: i32 = line.trim().parse().unwrap();

        handle.wait().await.unwrap();
        assert!(running(bg), "background job should outlive the shell");

        handle.kill_group(Duration::from_millis(500)).await;

        let mut gone = false;
        for _ in 0..100 {
            if !running(bg) {
                gone = true;
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(gone, "background job {bg} survived kill_group");
    }

    #[test]
    fn empty_argv_is_rejected() {
        let spec = CommandSpec::new(
            "empty",
            CommandLine::Argv(vec![]),
            Duration::from_secs(1),
        );
        assert!(build_command(&spec).is_err());
    }
}
