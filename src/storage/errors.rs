//! Storage error types
//!
//! Duplicate-key is the only storage error the versioning layer treats as
//! part of normal control flow (a concurrent writer claimed the live key).
//! Corruption is fatal: a record that fails its checksum must never be
//! silently skipped.

use std::fmt;

/// Result type for record-store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Severity of a storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation fails; the server continues.
    Error,
    /// The process must stop; on-disk state is untrustworthy.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors raised by record stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The record's live key is already taken by another record.
    DuplicateKey {
        /// Canonical form of the colliding key.
        key: String,
    },
    /// A record failed checksum validation on read.
    Corruption {
        /// Location of the damaged record.
        record_id: u64,
    },
    /// The record payload could not be encoded or decoded.
    Codec(String),
    /// The namespace or record addressed does not exist.
    UnknownRecord {
        /// Location that failed to resolve.
        record_id: u64,
    },
}

impl StorageError {
    /// Stable numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            StorageError::DuplicateKey { .. } => 999180,
            StorageError::Corruption { .. } => 999181,
            StorageError::Codec(_) => 999182,
            StorageError::UnknownRecord { .. } => 999183,
        }
    }

    /// Severity of this error.
    pub fn severity(&self) -> Severity {
        match self {
            StorageError::Corruption { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Returns true for live-key collisions.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StorageError::DuplicateKey { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DuplicateKey { key } => {
                write!(f, "duplicate key: live record exists for {}", key)
            }
            StorageError::Corruption { record_id } => {
                write!(f, "checksum mismatch reading record {}", record_id)
            }
            StorageError::Codec(msg) => write!(f, "record codec failure: {}", msg),
            StorageError::UnknownRecord { record_id } => {
                write!(f, "no record at location {}", record_id)
            }
        }
    }
}

impl std::error::Error for StorageError {}
