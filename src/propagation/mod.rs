//! Single-source-of-truth propagation between stores.
//!
//! - [`fields`] - the fixed authoritative / isolation / essential field sets
//!   and the module adjacency table
//! - [`engine`] - the propagation and reconciliation passes

pub mod engine;
pub mod fields;

pub use engine::{propagate_all, propagate_on_change, sync_isolation_values};
pub use fields::{
    essential_data_ok, is_authoritative_field, is_isolation_field, missing_essential_fields,
    related_stores, AUTHORITATIVE_FIELDS, ESSENTIAL_FIELDS, ISOLATION_FIELDS,
};
