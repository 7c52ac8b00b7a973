//! Record-store capability
//!
//! The executor consumes storage through the `RecordStore` trait: insert a
//! record, overwrite a record in place, read, remove, and iterate record ids
//! in location order. Record ids are the disk-location analogue - stable for
//! a record's lifetime and never reused within a namespace.
//!
//! The store enforces the live-key constraint: among records with a null
//! `transaction_end` (and among plain documents, which are all live), the
//! document id is unique. A write that would create a second current version
//! for the same user id fails with duplicate-key.

mod errors;
mod memory;
mod record;

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryRecordStore;
pub use record::{decode_record, encode_record};

use serde_json::Value;

/// Location of a record inside a namespace.
pub type RecordId = u64;

/// Storage operations the update pipeline depends on.
pub trait RecordStore {
    /// Appends a record and returns its new location.
    ///
    /// Fails with duplicate-key when the record's live key is taken.
    fn insert(&mut self, ns: &str, doc: &Value) -> StorageResult<RecordId>;

    /// Replaces the record at `id` in place, keeping its location.
    ///
    /// Fails with duplicate-key when the replacement's live key collides
    /// with a different record.
    fn overwrite(&mut self, ns: &str, id: RecordId, doc: &Value) -> StorageResult<()>;

    /// Reads the record at `id`. Returns None for unknown locations.
    fn read(&self, ns: &str, id: RecordId) -> StorageResult<Option<Value>>;

    /// Removes the record at `id`.
    fn remove(&mut self, ns: &str, id: RecordId) -> StorageResult<()>;

    /// Returns the first location strictly after `after` (or the first
    /// location overall when `after` is None). Records inserted during a
    /// scan are visible to it once the scan reaches their location.
    fn next_after(&self, ns: &str, after: Option<RecordId>) -> Option<RecordId>;

    /// Looks up the live record for a document id, using the unique
    /// live-key index.
    fn lookup_live(&self, ns: &str, user_id: &Value) -> Option<RecordId>;

    /// All locations in a namespace, in location order.
    fn scan(&self, ns: &str) -> Vec<RecordId>;
}
