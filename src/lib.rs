//! Typed command-line flags with deferred binding to configuration sources.
//!
//! `flagbind` wraps caller-owned variables ([`Target`](flag::Target)s) in
//! typed flag values that parse raw command-line strings, render their current
//! state for help output, and can be bound to a configuration key. A bound
//! flag reconciles with an external source just before its command runs: a
//! value given on the command line always wins, otherwise a value held by the
//! source (environment variable, configuration file, default) overwrites the
//! target.
//!
//! # Modules
//!
//! - [`flag`]: Typed and collection values, parsers, and the binding decorator
//! - [`command`]: A command tree on `clap` with ordered pre-execution hooks and
//!   flag groups
//! - [`source`]: Configuration sources, including layered [`Settings`](source::Settings)
//! - [`error`]: Semantic error types for the library

pub mod command;
pub mod error;
pub mod flag;
pub mod source;

pub use command::Command;
pub use error::{FlagbindError, Result};
