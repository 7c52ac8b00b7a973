//! Replication oplog sink
//!
//! The update pipeline emits one entry per durable record mutation so a
//! secondary can replay version-chain growth exactly:
//!
//! - closing a version: `{op: "u", ns, o: {$set: {transaction_end: <ts>}}, o2: <id pattern>}`
//!   where the id pattern carries the predecessor's full composite `_id`;
//! - inserting a successor (or a fresh document): `{op: "i", ns, o: <record>}`;
//! - removing a plain document: `{op: "d", ns, o: <id pattern>}`.
//!
//! The sink is append-only. It is passed into the executor explicitly so
//! tests can capture entries with the in-memory sink.

mod entry;

pub use entry::{OpKind, OplogEntry};

/// Append-only destination for replication entries.
pub trait OplogSink {
    /// Appends one entry. Ordering follows call order.
    fn append(&mut self, entry: OplogEntry);
}

/// In-memory sink collecting entries for inspection.
#[derive(Debug, Default)]
pub struct MemoryOplog {
    entries: Vec<OplogEntry>,
}

impl MemoryOplog {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries appended so far, in order.
    pub fn entries(&self) -> &[OplogEntry] {
        &self.entries
    }

    /// Number of entries appended.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OplogSink for MemoryOplog {
    fn append(&mut self, entry: OplogEntry) {
        self.entries.push(entry);
    }
}
