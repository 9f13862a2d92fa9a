//! Merge policy applied when loading the disk document.
//!
//! A narrow save (one module page persisting its own inputs) must not wipe
//! out already-computed state when it is loaded back. The policy is a small
//! declarative table: fields matching a rule's prefix mark the loaded data
//! as a partial update, in which case it is merged over the current data
//! (loaded values win) instead of replacing the store wholesale.

use crate::store::{StoreData, MODULE_INPUT_PREFIX};

/// How loaded data combines with current in-memory data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Merge field-by-field, loaded values winning.
    LoadedWins,
    /// Replace the current store wholesale.
    Replace,
}

/// One rule of the merge table: fields with this prefix signal the given
/// precedence for the whole store.
#[derive(Debug, Clone, Copy)]
pub struct MergeRule {
    pub field_prefix: &'static str,
    pub precedence: Precedence,
}

/// The merge table. Module-specific form inputs (`inputs_*`) are the only
/// fields that mark a loaded store as a partial update.
pub const MERGE_RULES: &[MergeRule] = &[MergeRule {
    field_prefix: MODULE_INPUT_PREFIX,
    precedence: Precedence::LoadedWins,
}];

/// Decide the precedence for a loaded store's data.
pub fn precedence_for(loaded: &StoreData) -> Precedence {
    for rule in MERGE_RULES {
        if loaded.keys().any(|k| k.starts_with(rule.field_prefix)) {
            return rule.precedence;
        }
    }
    Precedence::Replace
}

/// Combine the current store data with loaded data according to the table.
///
/// When the current store is empty there is nothing to preserve and the
/// loaded data is taken as-is.
pub fn merge_store(current: &StoreData, loaded: StoreData) -> StoreData {
    if current.is_empty() {
        return loaded;
    }
    match precedence_for(&loaded) {
        Precedence::Replace => loaded,
        Precedence::LoadedWins => {
            let mut merged = current.clone();
            for (field, value) in loaded {
                merged.insert(field, value);
            }
            merged
        }
    }
}
