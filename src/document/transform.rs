//! Version-record transforms: wrap, close, succeed
//!
//! `wrap_object_id` shapes a user document into a fresh current version,
//! `set_transaction_end` closes the current version, and
//! `set_transaction_start` derives the successor whose interval starts
//! exactly where the predecessor's ended. Chains stay contiguous because the
//! successor's start is copied from the close stamp, never re-read from the
//! clock.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::clock::OpTime;

use super::errors::{TransformError, TransformResult};
use super::path::get_path;
use super::{ID_FIELD, TRANSACTION_END, TRANSACTION_START, TRANSACTION_START_PATH, USER_ID_PATH};

/// Returns true if the document is already in version-record shape.
pub fn is_version_shape(doc: &Value) -> bool {
    get_path(doc, TRANSACTION_START_PATH).is_some()
}

/// Wraps a user document into a current version record.
///
/// The user's `_id` (or a freshly generated opaque id when absent) moves
/// under a composite `_id` carrying `start`, and a null `transaction_end`
/// is attached:
///
/// ```text
/// {_id: 7, a: 1}  =>  {_id: {_id: 7, transaction_start: <start>},
///                      transaction_end: null, a: 1}
/// ```
///
/// Idempotent: a document already in version shape is returned unchanged.
pub fn wrap_object_id(doc: &Value, start: OpTime) -> Value {
    if is_version_shape(doc) {
        return doc.clone();
    }

    let fields = match doc.as_object() {
        Some(map) => map,
        None => return doc.clone(),
    };

    let user_id = fields
        .get(ID_FIELD)
        .cloned()
        .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));

    let mut composite = Map::new();
    composite.insert(ID_FIELD.to_string(), user_id);
    composite.insert(TRANSACTION_START.to_string(), start.to_value());

    let mut out = Map::new();
    out.insert(ID_FIELD.to_string(), Value::Object(composite));
    out.insert(TRANSACTION_END.to_string(), Value::Null);
    for (key, value) in fields {
        if key != ID_FIELD {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}

/// Closes a current version record by stamping `transaction_end`.
///
/// Fails when `transaction_end` is absent (not a version record) or already
/// non-null (the record is historical and immutable).
pub fn set_transaction_end(doc: &Value, end: OpTime) -> TransformResult<Value> {
    match doc.get(TRANSACTION_END) {
        Some(Value::Null) => {}
        Some(_) => return Err(TransformError::AlreadyClosed),
        None => return Err(TransformError::NotVersioned),
    }

    let fields = doc.as_object().ok_or(TransformError::NotVersioned)?;
    let mut out = fields.clone();
    out.insert(TRANSACTION_END.to_string(), end.to_value());
    Ok(Value::Object(out))
}

/// Derives the successor record of a freshly closed predecessor.
///
/// Carries the predecessor's user id into `new_doc` and wraps it with
/// `start = predecessor.transaction_end`, so the chain's intervals stay
/// contiguous. Any composite `_id` or `transaction_end` residue on `new_doc`
/// is discarded first.
pub fn set_transaction_start(new_doc: &Value, predecessor: &Value) -> TransformResult<Value> {
    let end = match predecessor.get(TRANSACTION_END) {
        Some(value) if !value.is_null() => {
            OpTime::from_value(value).ok_or(TransformError::NotVersioned)?
        }
        _ => return Err(TransformError::PredecessorOpen),
    };
    let user_id = get_path(predecessor, USER_ID_PATH)
        .ok_or(TransformError::NotVersioned)?
        .clone();

    let mut base = Map::new();
    base.insert(ID_FIELD.to_string(), user_id);
    if let Some(fields) = new_doc.as_object() {
        for (key, value) in fields {
            if key != ID_FIELD && key != TRANSACTION_END {
                base.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(wrap_object_id(&Value::Object(base), end))
}

/// Collapses a version record back to the user's view of the document:
/// the composite `_id` becomes the plain user id and the temporal fields
/// disappear. Modifier sets are applied against this view.
pub fn user_view(record: &Value) -> Value {
    let fields = match record.as_object() {
        Some(map) => map,
        None => return record.clone(),
    };
    if !is_version_shape(record) {
        return record.clone();
    }

    let mut out = Map::new();
    if let Some(user_id) = get_path(record, USER_ID_PATH) {
        out.insert(ID_FIELD.to_string(), user_id.clone());
    }
    for (key, value) in fields {
        if key != ID_FIELD && key != TRANSACTION_END {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}
