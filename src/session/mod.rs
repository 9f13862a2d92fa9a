//! Named session snapshots in the backing datastore.
//!
//! - [`record`] - the persisted session record and listing summary
//! - [`backend`] - the datastore trait and the file-backed implementation
//! - [`manager`] - save/load/delete orchestration and the failure protocol

pub mod backend;
pub mod manager;
pub mod record;

pub use backend::{FileSessionBackend, SessionBackend};
pub use manager::SessionManager;
pub use record::{SessionRecord, SessionSummary};
