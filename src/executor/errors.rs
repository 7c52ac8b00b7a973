//! Update-pipeline error types
//!
//! The executor surfaces its collaborators' errors unchanged (selector
//! rewriting, version transforms, storage) and adds the pipeline's own
//! kinds. Everything except duplicate-key and cancellation aborts before
//! any mutation is performed; see the module docs on `update` for the
//! duplicate-key window after a close.

use thiserror::Error;

use crate::document::TransformError;
use crate::query::QueryError;
use crate::storage::StorageError;

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Errors raised by the update pipeline.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Writes to reserved `$` collections and non-whitelisted `system.*`
    /// namespaces are refused.
    #[error("cannot write to reserved namespace: {0}")]
    InvalidNamespace(String),

    /// The update document is not applicable: unknown or mixed modifiers,
    /// a modifier over a protected field, a type-mismatched modifier, or a
    /// multi upsert without operators.
    #[error("invalid update: {0}")]
    InvalidModifier(String),

    /// A produced record exceeds the per-document byte cap.
    #[error("document too large: {size} bytes exceeds cap of {max}")]
    DocumentTooLarge { size: usize, max: usize },

    /// Cooperative cancellation stopped the operation at a yield point.
    /// Mutations counted here are committed and stay.
    #[error("operation cancelled after {committed} mutations")]
    Cancelled { committed: u64 },

    /// Selector rewriting failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A version transform was asked for an illegal transition.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The record store refused or failed an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ExecutorError {
    /// Stable numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            ExecutorError::InvalidNamespace(_) => 999170,
            ExecutorError::InvalidModifier(_) => 999171,
            ExecutorError::DocumentTooLarge { .. } => 999172,
            ExecutorError::Cancelled { .. } => 999190,
            ExecutorError::Query(err) => err.code(),
            ExecutorError::Transform(err) => err.code(),
            ExecutorError::Storage(err) => err.code(),
        }
    }

    /// Returns true when a concurrent writer claimed the live key.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, ExecutorError::Storage(err) if err.is_duplicate_key())
    }
}
