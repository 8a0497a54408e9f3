// src/relay/mod.rs

//! Command relay: the part of the system that talks to operators.
//!
//! Inbound commands flow through [`router`] (authorization gate + dispatch
//! table), then [`executor`] (runs the operation and renders one reply). The
//! chat front end and the allow-list lookup are reached only through the
//! traits in [`reply`].

/// Numeric identity of the caller, as supplied by the chat front end.
pub type UserId = i64;

pub mod executor;
pub mod messages;
pub mod reply;
pub mod router;

pub use executor::{CommandExecutor, render_outcome};
pub use reply::{AllowList, Authorizer, ReplySink};
pub use router::{CommandRouter, Dispatch, Operation, RelayCommand};
