//! Disk persistence for the full store snapshot.
//!
//! - [`disk`] - the on-disk JSON document with backup rotation
//! - [`merge`] - the declarative merge policy applied on load

pub mod disk;
pub mod merge;

pub use disk::DiskPersistence;
pub use merge::{merge_store, precedence_for, MergeRule, Precedence, MERGE_RULES};
