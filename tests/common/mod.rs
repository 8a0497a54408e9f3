#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

pub use relaybot_test_utils::{init_tracing, with_timeout};

/// True if a process with this pid is still running.
///
/// Zombies count as gone: an orphan killed by the supervisor is reaped by
/// init, not by us. Without procfs only existence is checked.
#[cfg(unix)]
pub fn process_alive(pid: i32) -> bool {
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

/// Poll `process_alive` until it turns false or `within` elapses.
#[cfg(unix)]
pub async fn process_gone_within(pid: i32, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    !process_alive(pid)
}

/// Poll for a pid file written by a test script.
pub async fn read_pid_file(path: &Path) -> i32 {
    for _ in 0..200 {
        if let Ok(s) = std::fs::read_to_string(path) {
            if let Ok(pid) = s.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pid file {} never appeared", path.display());
}
