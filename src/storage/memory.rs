//! In-memory record store
//!
//! Reference implementation of the `RecordStore` capability. Records are
//! kept in their framed encoded form and validated on every read, so the
//! checksum contract is exercised exactly as a file-backed store would.
//!
//! Locations are handed out from a monotonic counter and never reused. The
//! live-key index maps a document id to its single live record: the current
//! version of a versioned chain, or the record itself for plain documents.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use serde_json::Value;

use crate::document::{get_path, is_version_shape, ID_FIELD, TRANSACTION_END, USER_ID_PATH};

use super::errors::{StorageError, StorageResult};
use super::record::{decode_record, encode_record};
use super::{RecordId, RecordStore};

#[derive(Default)]
struct Namespace {
    records: BTreeMap<RecordId, Vec<u8>>,
    live: HashMap<String, RecordId>,
}

/// In-memory `RecordStore` implementation.
#[derive(Default)]
pub struct MemoryRecordStore {
    namespaces: HashMap<String, Namespace>,
    next_id: RecordId,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a namespace.
    pub fn len(&self, ns: &str) -> usize {
        self.namespaces.get(ns).map_or(0, |n| n.records.len())
    }

    /// Returns true if the namespace holds no records.
    pub fn is_empty(&self, ns: &str) -> bool {
        self.len(ns) == 0
    }

    fn namespace_mut(&mut self, ns: &str) -> &mut Namespace {
        self.namespaces.entry(ns.to_string()).or_default()
    }
}

/// The unique key a record occupies while live, if any. Historical versions
/// hold no key, which is what lets a chain grow while its user id stays
/// unique among current versions.
fn live_key(doc: &Value) -> Option<String> {
    if is_version_shape(doc) {
        match doc.get(TRANSACTION_END) {
            Some(Value::Null) => get_path(doc, USER_ID_PATH).map(canonical_key),
            _ => None,
        }
    } else {
        doc.get(ID_FIELD).map(canonical_key)
    }
}

fn canonical_key(id: &Value) -> String {
    id.to_string()
}

impl RecordStore for MemoryRecordStore {
    fn insert(&mut self, ns: &str, doc: &Value) -> StorageResult<RecordId> {
        let bytes = encode_record(doc)?;
        let key = live_key(doc);

        let namespace = self.namespace_mut(ns);
        if let Some(key) = &key {
            if namespace.live.contains_key(key) {
                return Err(StorageError::DuplicateKey { key: key.clone() });
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let namespace = self.namespace_mut(ns);
        namespace.records.insert(id, bytes);
        if let Some(key) = key {
            namespace.live.insert(key, id);
        }
        Ok(id)
    }

    fn overwrite(&mut self, ns: &str, id: RecordId, doc: &Value) -> StorageResult<()> {
        let bytes = encode_record(doc)?;
        let new_key = live_key(doc);

        let namespace = self
            .namespaces
            .get_mut(ns)
            .ok_or(StorageError::UnknownRecord { record_id: id })?;
        let old_bytes = namespace
            .records
            .get(&id)
            .ok_or(StorageError::UnknownRecord { record_id: id })?;
        let old_doc = decode_record(old_bytes, id)?;

        if let Some(key) = &new_key {
            if let Some(&holder) = namespace.live.get(key) {
                if holder != id {
                    return Err(StorageError::DuplicateKey { key: key.clone() });
                }
            }
        }

        if let Some(old_key) = live_key(&old_doc) {
            namespace.live.remove(&old_key);
        }
        namespace.records.insert(id, bytes);
        if let Some(key) = new_key {
            namespace.live.insert(key, id);
        }
        Ok(())
    }

    fn read(&self, ns: &str, id: RecordId) -> StorageResult<Option<Value>> {
        let Some(namespace) = self.namespaces.get(ns) else {
            return Ok(None);
        };
        match namespace.records.get(&id) {
            Some(bytes) => decode_record(bytes, id).map(Some),
            None => Ok(None),
        }
    }

    fn remove(&mut self, ns: &str, id: RecordId) -> StorageResult<()> {
        let namespace = self
            .namespaces
            .get_mut(ns)
            .ok_or(StorageError::UnknownRecord { record_id: id })?;
        let bytes = namespace
            .records
            .remove(&id)
            .ok_or(StorageError::UnknownRecord { record_id: id })?;
        let doc = decode_record(&bytes, id)?;
        if let Some(key) = live_key(&doc) {
            namespace.live.remove(&key);
        }
        Ok(())
    }

    fn next_after(&self, ns: &str, after: Option<RecordId>) -> Option<RecordId> {
        let namespace = self.namespaces.get(ns)?;
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        namespace
            .records
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(&id, _)| id)
    }

    fn lookup_live(&self, ns: &str, user_id: &Value) -> Option<RecordId> {
        self.namespaces
            .get(ns)?
            .live
            .get(&canonical_key(user_id))
            .copied()
    }

    fn scan(&self, ns: &str) -> Vec<RecordId> {
        self.namespaces
            .get(ns)
            .map(|n| n.records.keys().copied().collect())
            .unwrap_or_default()
    }
}
