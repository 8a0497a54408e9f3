// src/exec/backend.rs

//! Pluggable runner abstraction.
//!
//! The command executor talks to a `ProcessRunner` instead of the supervisor
//! directly. Production code uses [`ProcessSupervisor`]; tests can provide a
//! runner that counts invocations and returns scripted outcomes without
//! spawning anything.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::spec::{CommandSpec, ExecutionOutcome};
use super::supervisor::ProcessSupervisor;

/// Trait abstracting how a `CommandSpec` is turned into an outcome.
pub trait ProcessRunner: Send + Sync {
    /// Run `spec` to completion.
    ///
    /// Implementations must produce exactly one outcome and must not leave a
    /// process running once the future resolves.
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>>;
}

impl ProcessRunner for ProcessSupervisor {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        Box::pin(self.supervise(spec))
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for Arc<R> {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        (**self).run(spec)
    }
}
