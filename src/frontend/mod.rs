// src/frontend/mod.rs

//! Front ends that feed commands into the router.
//!
//! The relay only needs a `ReplySink` per inbound message; [`console`] is the
//! line-oriented front end shipped with the binary.

pub mod console;

pub use console::{ConsoleReply, parse_line, serve};
