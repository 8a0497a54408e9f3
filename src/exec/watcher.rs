// src/exec/watcher.rs

//! Output stream watchers.
//!
//! One watcher runs per child output stream, each in its own Tokio task. A
//! watcher drains its stream into a private buffer and, if a trigger is
//! configured, stops at the first occurrence of the trigger after signalling
//! the supervisor. The buffer is handed back through the task's `JoinHandle`,
//! so the supervisor never shares mutable state with a running watcher.
//! A watcher can also be told to stop early, in which case it returns what it
//! has read so far.

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch as stop_watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Per-stream capture limit. Scanning for the trigger continues past it.
pub const MAX_CAPTURE_BYTES: usize = 256 * 1024;

const READ_CHUNK: usize = 4096;

/// Receiving end of a watcher stop request. Flips to `true` once.
pub type StopSignal = stop_watch::Receiver<bool>;

/// Create the sender/receiver pair used to stop watchers early.
pub fn stop_channel() -> (stop_watch::Sender<bool>, StopSignal) {
    stop_watch::channel(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// What one watcher saw on its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchResult {
    pub stream: StreamKind,
    /// Set at most once, when the trigger is found.
    pub triggered: bool,
    /// Bytes read before the watch ended (capped at `MAX_CAPTURE_BYTES`).
    pub output: Vec<u8>,
    pub truncated: bool,
}

impl WatchResult {
    pub fn empty(stream: StreamKind) -> Self {
        Self {
            stream,
            triggered: false,
            output: Vec::new(),
            truncated: false,
        }
    }

    /// Captured output as (lossy) UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    fn capture(&mut self, chunk: &[u8]) {
        let room = MAX_CAPTURE_BYTES.saturating_sub(self.output.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.output.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
}

/// Incremental substring matcher.
///
/// Only the last `trigger.len() - 1` bytes of previous input are retained, so
/// a trigger split across two reads is still found without rescanning
/// everything seen so far.
#[derive(Debug, Clone)]
pub struct TriggerScanner {
    needle: Vec<u8>,
    tail: Vec<u8>,
}

impl TriggerScanner {
    pub fn new(trigger: &str) -> Self {
        Self {
            needle: trigger.as_bytes().to_vec(),
            tail: Vec::new(),
        }
    }

    /// Feed the next chunk; returns true once the trigger has been seen in the
    /// concatenation of everything fed so far.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        if self.needle.is_empty() {
            return false;
        }

        let mut window = std::mem::take(&mut self.tail);
        window.extend_from_slice(chunk);

        let found = window
            .windows(self.needle.len())
            .any(|w| w == self.needle.as_slice());

        let keep = self.needle.len() - 1;
        let start = window.len().saturating_sub(keep);
        self.tail = window.split_off(start);

        found
    }
}

/// Drain `stream` until EOF, until `trigger` shows up, or until `stop` fires.
///
/// On detection the stream kind is sent on `signal` and reading stops
/// immediately; the watcher does not wait for the stream to close. Read
/// errors end the watch like EOF does. A stop request (or a dropped stop
/// sender) ends the watch with whatever was captured up to that point.
pub async fn watch<R>(
    mut stream: R,
    kind: StreamKind,
    trigger: Option<String>,
    signal: mpsc::Sender<StreamKind>,
    mut stop: StopSignal,
) -> WatchResult
where
    R: AsyncRead + Unpin,
{
    let mut scanner = trigger.as_deref().map(TriggerScanner::new);
    let mut result = WatchResult::empty(kind);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => {
                debug!(stream = %kind, "stop requested; ending watch");
                break;
            }
            read = stream.read(&mut buf) => read,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(stream = %kind, error = %e, "read error; ending watch");
                break;
            }
        };

        let chunk = &buf[..n];
        trace!(stream = %kind, bytes = n, "read chunk");
        result.capture(chunk);

        if let Some(scanner) = scanner.as_mut() {
            if scanner.feed(chunk) {
                debug!(stream = %kind, "credential trigger detected");
                result.triggered = true;
                // Capacity covers one signal per watcher; a closed receiver
                // just means the supervisor already moved on.
                let _ = signal.try_send(kind);
                break;
            }
        }
    }

    debug!(
        stream = %kind,
        bytes = result.output.len(),
        triggered = result.triggered,
        "watch ended"
    );
    result
}

/// Spawn [`watch`] as an independent Tokio task.
pub fn spawn_watcher<R>(
    stream: R,
    kind: StreamKind,
    trigger: Option<String>,
    signal: mpsc::Sender<StreamKind>,
    stop: StopSignal,
) -> JoinHandle<WatchResult>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(watch(stream, kind, trigger, signal, stop))
}
