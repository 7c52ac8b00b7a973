//! Query-rewrite error types
//!
//! Malformed `transaction` selectors abort the operation before any predicate
//! is evaluated; a selector that pins a historical version on a write path is
//! an invariant violation, not a syntax error, and carries its own code.

use std::fmt;

/// Result type for selector rewriting.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while rewriting a user selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The `transaction` value is not one of the recognized subforms.
    BadTransactionSelector,
    /// `inrange` is not a two-element array with at least one non-null
    /// timestamp bound.
    BadRangeBounds(&'static str),
    /// `current` or `all` was present but not the boolean `true`.
    BadFlagValue(&'static str),
    /// A write selector explicitly constrains `transaction_end` to a
    /// non-null value; mutating historical versions is never allowed.
    HistoricalWrite,
}

impl QueryError {
    /// Stable numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            QueryError::BadTransactionSelector => 999150,
            QueryError::BadRangeBounds(_) => 999151,
            QueryError::BadFlagValue(_) => 999152,
            QueryError::HistoricalWrite => 999162,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::BadTransactionSelector => {
                write!(f, "unrecognized transaction selector form")
            }
            QueryError::BadRangeBounds(detail) => {
                write!(f, "invalid inrange bounds: {}", detail)
            }
            QueryError::BadFlagValue(flag) => {
                write!(f, "transaction.{} must be the boolean true", flag)
            }
            QueryError::HistoricalWrite => {
                write!(f, "selector pins a historical version; writes may only target current versions")
            }
        }
    }
}

impl std::error::Error for QueryError {}
