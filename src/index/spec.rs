//! Index specification types
//!
//! Keys are kept as an ordered list, not a map: prefix position is what
//! makes a current-version lookup cheap, so ordering is semantic.

use serde::{Deserialize, Serialize};

/// One key entry of an index: a field and a numeric direction.
///
/// Direction follows the wire convention: `1` ascending, `-1` descending.
/// The synthetic entry `transaction: 0` is recognized by the rewriter as an
/// opt-out marker and never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    /// Field name (dotted paths allowed).
    pub field: String,
    /// Sort direction of the entry.
    pub order: i64,
}

impl IndexKey {
    /// Creates an ascending key entry.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: 1,
        }
    }

    /// Creates a descending key entry.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: -1,
        }
    }

    /// Creates a key entry with an explicit numeric direction.
    pub fn with_order(field: impl Into<String>, order: i64) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// An index definition over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Ordered key entries.
    pub keys: Vec<IndexKey>,
}

impl IndexSpec {
    /// Creates an index spec.
    pub fn new(name: impl Into<String>, keys: Vec<IndexKey>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }

    /// Returns true if any key entry addresses `field`.
    pub fn covers(&self, field: &str) -> bool {
        self.keys.iter().any(|key| key.field == field)
    }

    /// Iterates the indexed field names in key order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|key| key.field.as_str())
    }
}
