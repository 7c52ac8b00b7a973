//! Sort-key rewriting
//!
//! A sort key named `transaction` is a user-facing synonym for the storage
//! field `transaction_end`; the rewrite preserves direction and leaves every
//! other key untouched.

use crate::document::TRANSACTION_END;

use super::TRANSACTION_OPERATOR;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A single sort key with its direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field name (dotted paths allowed).
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

/// An ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    /// Keys in significance order.
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    /// Creates an empty sort specification.
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Appends an ascending key.
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(SortKey {
            field: field.into(),
            direction: SortDirection::Asc,
        });
        self
    }

    /// Appends a descending key.
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(SortKey {
            field: field.into(),
            direction: SortDirection::Desc,
        });
        self
    }

    /// Returns true if no keys are specified.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Replaces the `transaction` sort key with `transaction_end`, preserving
/// direction. Idempotent: re-applying never changes an already rewritten
/// specification.
pub fn add_temporal_order(sort: &SortSpec) -> SortSpec {
    SortSpec {
        keys: sort
            .keys
            .iter()
            .map(|key| SortKey {
                field: if key.field == TRANSACTION_OPERATOR {
                    TRANSACTION_END.to_string()
                } else {
                    key.field.clone()
                },
                direction: key.direction,
            })
            .collect(),
    }
}
