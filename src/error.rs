//! Error types for engine operations.
//!
//! This module defines [`McpError`], the primary error type used throughout
//! the engine, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Internal modules return `McpError` and propagate with `?`
//! - The [`Mcp`](crate::engine::Mcp) facade converts expected failures into
//!   status values (booleans or signed session codes) and keeps the message
//!   available via `last_error()`
//! - Use `anyhow::Error` (via `McpError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for engine operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// A textual store id does not name a registered store.
    #[error("Unknown store id: {id}")]
    UnknownStore { id: String },

    /// A store's data could not be serialized for persistence.
    #[error("Failed to serialize store '{store}': {message}")]
    Serialization { store: String, message: String },

    /// A session with the requested name already exists.
    #[error("Session name '{name}' already exists")]
    DuplicateName { name: String },

    /// Reading or writing the on-disk state document failed.
    #[error("Persistence failed for {}: {message}", path.display())]
    PersistenceIo { path: PathBuf, message: String },

    /// The session backend rejected or failed an operation.
    #[error("Session backend error: {message}")]
    Backend { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, McpError>;
