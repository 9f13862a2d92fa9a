//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Trafomcp - transformer test data synchronization and persistence engine.
#[derive(Debug, Parser)]
#[command(name = "trafomcp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (state document and session store)
    #[arg(long, global = true, env = "TRAFOMCP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show store fill state and data health
    Status,

    /// Show recorded changes (per process; disk loads are not recorded, so
    /// a fresh invocation starts with an empty log)
    History(HistoryArgs),

    /// Persist the current state to the disk document
    Save(SaveArgs),

    /// Reload state from the disk document
    Load,

    /// Reset every store to its defaults
    Clear(ClearArgs),

    /// Repopulate the authoritative store from module-store copies
    Recover,

    /// Manage named sessions
    #[command(subcommand)]
    Session(SessionCommands),
}

/// Arguments for the `history` command.
#[derive(Debug, Clone, clap::Args)]
pub struct HistoryArgs {
    /// Show only the last N records
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the `save` command.
#[derive(Debug, Clone, clap::Args)]
pub struct SaveArgs {
    /// Save even when essential data is missing
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `clear` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ClearArgs {
    /// Push the reset defaults back out to the module stores
    #[arg(long)]
    pub propagate: bool,
}

/// Session management subcommands.
#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    /// Save the current state as a named session
    Save(SessionSaveArgs),

    /// Load a session by id
    Load(SessionLoadArgs),

    /// List saved sessions, most recent first
    List,

    /// Delete a session by id
    Delete(SessionDeleteArgs),
}

/// Arguments for `session save`.
#[derive(Debug, Clone, clap::Args)]
pub struct SessionSaveArgs {
    /// Unique session name
    #[arg(short, long)]
    pub name: String,

    /// Free-text notes
    #[arg(long, default_value = "")]
    pub notes: String,
}

/// Arguments for `session load`.
#[derive(Debug, Clone, clap::Args)]
pub struct SessionLoadArgs {
    /// Session id
    pub id: i64,

    /// Re-propagate authoritative data after loading
    #[arg(long)]
    pub propagate: bool,
}

/// Arguments for `session delete`.
#[derive(Debug, Clone, clap::Args)]
pub struct SessionDeleteArgs {
    /// Session id
    pub id: i64,
}
