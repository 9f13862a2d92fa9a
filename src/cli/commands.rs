//! CLI command implementations.
//!
//! Each subcommand is a thin wrapper over the engine: build an [`Mcp`]
//! rooted at the data directory, reload the disk document where it makes
//! sense, run the operation, report through the exit code.

use tracing::debug;

use crate::cli::args::{Cli, Commands, SessionCommands};
use crate::diagnostics;
use crate::engine::{
    Mcp, McpConfig, SESSION_ERR_DUPLICATE, SESSION_ERR_SERIALIZATION,
};
use crate::error::Result;
use crate::recovery;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Route a parsed command line to its implementation.
pub fn dispatch(cli: &Cli) -> Result<CommandResult> {
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(McpConfig::default_data_dir);
    debug!("Using data directory {data_dir:?}");

    let mcp = Mcp::new(McpConfig::at(data_dir));

    match &cli.command {
        Commands::Status => status(&mcp),
        Commands::History(args) => history(&mcp, args.limit),
        Commands::Save(args) => save(&mcp, args.force),
        Commands::Load => load(&mcp),
        Commands::Clear(args) => clear(&mcp, args.propagate),
        Commands::Recover => recover(&mcp),
        Commands::Session(session) => dispatch_session(&mcp, session),
    }
}

fn dispatch_session(mcp: &Mcp, command: &SessionCommands) -> Result<CommandResult> {
    match command {
        SessionCommands::Save(args) => session_save(mcp, &args.name, &args.notes),
        SessionCommands::Load(args) => session_load(mcp, args.id, args.propagate),
        SessionCommands::List => session_list(mcp),
        SessionCommands::Delete(args) => session_delete(mcp, args.id),
    }
}

fn status(mcp: &Mcp) -> Result<CommandResult> {
    mcp.load_from_disk();
    print!("{}", diagnostics::diagnose(mcp));
    Ok(CommandResult::success())
}

fn history(mcp: &Mcp, limit: Option<usize>) -> Result<CommandResult> {
    mcp.load_from_disk();
    let records = mcp.get_change_history(limit);
    if records.is_empty() {
        println!("No changes recorded in this invocation.");
        return Ok(CommandResult::success());
    }

    for record in records {
        println!(
            "{} {} ({} changed fields)",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.store_id,
            record.changes.len()
        );
        for change in &record.changes {
            println!(
                "    {}: {} -> {}",
                change.field,
                format_value(change.old.as_ref()),
                format_value(change.new.as_ref())
            );
        }
    }
    Ok(CommandResult::success())
}

fn format_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None => "(absent)".to_string(),
        Some(v) => v.to_string(),
    }
}

fn save(mcp: &Mcp, force: bool) -> Result<CommandResult> {
    mcp.load_from_disk();
    if mcp.save_to_disk(force) {
        println!("State saved.");
        Ok(CommandResult::success())
    } else {
        eprintln!("Save skipped: no data to persist (use --force to override).");
        Ok(CommandResult::failure(1))
    }
}

fn load(mcp: &Mcp) -> Result<CommandResult> {
    if mcp.load_from_disk() {
        println!("State loaded from disk.");
        Ok(CommandResult::success())
    } else {
        eprintln!(
            "Load failed: {}",
            mcp.last_error().unwrap_or_else(|| "no disk document".into())
        );
        Ok(CommandResult::failure(1))
    }
}

fn clear(mcp: &Mcp, propagate: bool) -> Result<CommandResult> {
    mcp.clear_all(propagate);
    mcp.save_to_disk(true);
    println!("All stores reset to defaults.");
    Ok(CommandResult::success())
}

fn recover(mcp: &Mcp) -> Result<CommandResult> {
    mcp.load_from_disk();
    if recovery::fix_data_synchronization(mcp) {
        println!("Authoritative data recovered and re-propagated.");
        Ok(CommandResult::success())
    } else {
        eprintln!("No recoverable transformer data found in module stores.");
        Ok(CommandResult::failure(1))
    }
}

fn session_save(mcp: &Mcp, name: &str, notes: &str) -> Result<CommandResult> {
    mcp.load_from_disk();
    let code = mcp.save_session(name, notes, None);
    if code > 0 {
        println!("Session '{name}' saved with id {code}.");
        return Ok(CommandResult::success());
    }

    let reason = match code {
        SESSION_ERR_DUPLICATE => format!("a session named '{name}' already exists"),
        SESSION_ERR_SERIALIZATION => "session data failed to serialize".to_string(),
        _ => mcp
            .last_error()
            .unwrap_or_else(|| "backend error".to_string()),
    };
    eprintln!("Session save failed: {reason}.");
    Ok(CommandResult::failure(1))
}

fn session_load(mcp: &Mcp, id: i64, propagate: bool) -> Result<CommandResult> {
    if mcp.load_session(id, propagate) {
        mcp.save_to_disk(true);
        println!("Session {id} loaded.");
        Ok(CommandResult::success())
    } else {
        eprintln!(
            "Session load failed: {}",
            mcp.last_error().unwrap_or_else(|| format!("session {id} not found"))
        );
        Ok(CommandResult::failure(1))
    }
}

fn session_list(mcp: &Mcp) -> Result<CommandResult> {
    let sessions = mcp.list_sessions();
    if sessions.is_empty() {
        println!("No saved sessions.");
        return Ok(CommandResult::success());
    }

    for session in sessions {
        print!(
            "{:>4}  {}  {}",
            session.id,
            session.timestamp.format("%Y-%m-%d %H:%M"),
            session.name
        );
        if session.notes.is_empty() {
            println!();
        } else {
            println!("  ({})", session.notes);
        }
    }
    Ok(CommandResult::success())
}

fn session_delete(mcp: &Mcp, id: i64) -> Result<CommandResult> {
    if mcp.delete_session(id) {
        println!("Session {id} deleted.");
        Ok(CommandResult::success())
    } else {
        eprintln!("Session {id} not found.");
        Ok(CommandResult::failure(1))
    }
}
