//! Catalog error types

use std::fmt;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised by the collection catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A collection with this name already exists.
    CollectionExists(String),
    /// No collection with this name exists.
    CollectionNotFound(String),
    /// An index with this name is already registered.
    IndexExists(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::CollectionExists(name) => {
                write!(f, "collection already exists: {}", name)
            }
            CatalogError::CollectionNotFound(name) => {
                write!(f, "collection not found: {}", name)
            }
            CatalogError::IndexExists(name) => write!(f, "index already exists: {}", name),
        }
    }
}

impl std::error::Error for CatalogError {}
