//! Command-line interface.
//!
//! - [`args`] - argument definitions using clap's derive macros
//! - [`commands`] - command implementations over the engine

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, SessionCommands};
pub use commands::{dispatch, CommandResult};
