//! Outcome types for write operations

use serde_json::Value;

/// Result of one logical update operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Whether any existing document matched the selector.
    pub existing: bool,
    /// Number of logical documents modified.
    pub modified: u64,
    /// The record inserted by an upsert, if one happened.
    pub upserted: Option<Value>,
}

impl UpdateOutcome {
    /// Outcome of a match that modified `n` documents.
    pub fn matched(n: u64) -> Self {
        Self {
            existing: true,
            modified: n,
            upserted: None,
        }
    }

    /// Outcome when nothing matched and no upsert was requested.
    pub fn none() -> Self {
        Self {
            existing: false,
            modified: 0,
            upserted: None,
        }
    }

    /// Outcome of an upsert that inserted `record`.
    pub fn upserted(record: Value) -> Self {
        Self {
            existing: false,
            modified: 1,
            upserted: Some(record),
        }
    }
}
