// The authoritative defaults are one large json! literal.
#![recursion_limit = "256"]

//! Trafomcp - state synchronization and persistence for transformer test
//! calculations.
//!
//! The engine keeps one authoritative store of transformer nameplate data
//! and a set of per-module calculation stores, propagating writes between
//! them under a single-source-of-truth policy. State survives restarts
//! through an atomic disk document and named session snapshots.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`diagnostics`] - Store fill-state and data health reporting
//! - [`engine`] - The [`engine::Mcp`] facade tying everything together
//! - [`error`] - Error types and result aliases
//! - [`normalize`] - Data normalization at the engine boundary
//! - [`persistence`] - Disk document save/load and the merge policy
//! - [`propagation`] - Single-source-of-truth propagation between stores
//! - [`recovery`] - Authoritative-data recovery from module-store copies
//! - [`session`] - Named session snapshots
//! - [`store`] - Store identities, state container, history, listeners
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use trafomcp::engine::{Mcp, McpConfig};
//! use trafomcp::store::{StoreId, LINKED_DATA_KEY};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mcp = Mcp::new(McpConfig::at(dir.path()));
//!
//! let mut inputs = mcp.get(StoreId::TransformerInputs);
//! inputs.insert("potencia_mva".into(), json!(100.0));
//! mcp.set(StoreId::TransformerInputs, inputs, true);
//!
//! // The write propagated into every module store's linked data.
//! let losses = mcp.get(StoreId::Losses);
//! assert_eq!(losses[LINKED_DATA_KEY]["potencia_mva"], json!(100.0));
//! ```

pub mod cli;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod persistence;
pub mod propagation;
pub mod recovery;
pub mod session;
pub mod store;

pub use error::{McpError, Result};
