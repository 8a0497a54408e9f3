use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use relaybot::errors::Result;
use relaybot::exec::{CommandSpec, ExecutionOutcome, ProcessRunner};
use relaybot::relay::ReplySink;

/// A fake runner that:
/// - counts how many times it was asked to "spawn"
/// - records the specs it received
/// - returns a fixed outcome without starting any process.
#[derive(Clone)]
pub struct FakeRunner {
    outcome: ExecutionOutcome,
    spawns: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<CommandSpec>>>,
}

impl FakeRunner {
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            spawns: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(ExecutionOutcome::Success {
            stdout: String::new(),
        })
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn seen_specs(&self) -> Vec<CommandSpec> {
        self.seen.lock().unwrap().clone()
    }
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(spec.clone());
            self.outcome.clone()
        })
    }
}

/// Reply sink that records every reply in order.
#[derive(Clone, Default)]
pub struct RecordingReply {
    replies: Arc<Mutex<Vec<String>>>,
}

impl RecordingReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.replies.lock().unwrap().last().cloned()
    }
}

impl ReplySink for RecordingReply {
    fn send_reply(&self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.replies.lock().unwrap().push(text);
            Ok(())
        })
    }
}
