// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running operation commands, using
//! `tokio::process::Command`, and classifying how they ended.
//!
//! - [`spec`] defines `CommandSpec` (what to run) and `ExecutionOutcome`.
//! - [`watcher`] drains one output stream and looks for the credential
//!   trigger.
//! - [`handle`] owns the child process and its termination sequence.
//! - [`supervisor`] races the watchers against exit and timeout, and
//!   reconciles the result.
//! - [`backend`] provides the `ProcessRunner` trait that the command executor
//!   uses, and which tests replace with a fake implementation.

pub mod backend;
pub mod handle;
pub mod spec;
pub mod supervisor;
pub mod watcher;

pub use backend::ProcessRunner;
pub use handle::ProcessHandle;
pub use spec::{CommandSpec, ExecutionOutcome};
pub use supervisor::{ProcessSupervisor, RaceEvent};
pub use watcher::{StreamKind, TriggerScanner, WatchResult};
