//! Oplog entry types

use serde::Serialize;
use serde_json::Value;

/// Operation discriminant, serialized with the single-letter wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpKind {
    /// A full record insert.
    #[serde(rename = "i")]
    Insert,
    /// A partial update addressed by `o2`.
    #[serde(rename = "u")]
    Update,
    /// A record removal addressed by `o`.
    #[serde(rename = "d")]
    Delete,
}

impl OpKind {
    /// Wire letter of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Insert => "i",
            OpKind::Update => "u",
            OpKind::Delete => "d",
        }
    }
}

/// One replication entry.
#[derive(Debug, Clone, Serialize)]
pub struct OplogEntry {
    /// Operation kind.
    pub op: OpKind,
    /// Namespace the operation applies to.
    pub ns: String,
    /// Operation body: full record for inserts, delta for updates,
    /// id pattern for deletes.
    pub o: Value,
    /// Addressing pattern for updates; None otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub o2: Option<Value>,
}

impl OplogEntry {
    /// Entry for a full record insert.
    pub fn insert(ns: impl Into<String>, record: Value) -> Self {
        Self {
            op: OpKind::Insert,
            ns: ns.into(),
            o: record,
            o2: None,
        }
    }

    /// Entry for a partial update of the record matching `pattern`.
    pub fn update(ns: impl Into<String>, delta: Value, pattern: Value) -> Self {
        Self {
            op: OpKind::Update,
            ns: ns.into(),
            o: delta,
            o2: Some(pattern),
        }
    }

    /// Entry for the removal of the record matching `pattern`.
    pub fn delete(ns: impl Into<String>, pattern: Value) -> Self {
        Self {
            op: OpKind::Delete,
            ns: ns.into(),
            o: pattern,
            o2: None,
        }
    }
}
