//! Version-transform error types
//!
//! Every variant is an invariant violation: the caller asked for a
//! transition the version chain does not permit. None of these are
//! recoverable by retrying the same call.

use std::fmt;

/// Result type for version transforms.
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors raised by the wrap/close/succeed transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Close was asked to stamp a record whose interval is already closed.
    /// Historical records are immutable.
    AlreadyClosed,
    /// Succeed was given a predecessor that is still current; the successor's
    /// start would be undefined.
    PredecessorOpen,
    /// The document is not in version-record shape where one was required.
    NotVersioned,
}

impl TransformError {
    /// Stable numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            TransformError::AlreadyClosed => 999160,
            TransformError::PredecessorOpen => 999161,
            TransformError::NotVersioned => 999163,
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::AlreadyClosed => {
                write!(f, "cannot close a historical version record")
            }
            TransformError::PredecessorOpen => {
                write!(f, "predecessor record is still current")
            }
            TransformError::NotVersioned => {
                write!(f, "document is not a version record")
            }
        }
    }
}

impl std::error::Error for TransformError {}
