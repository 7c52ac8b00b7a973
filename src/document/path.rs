//! Dotted-path access into JSON documents
//!
//! Selectors and transforms address nested fields with dotted paths
//! ("_id.transaction_start"). Only object nesting is traversed; array
//! positions are not addressable.

use serde_json::Value;

/// Resolves a dotted path against a document.
///
/// Returns None when any segment is missing or a non-object is traversed.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Returns true if the dotted path resolves to any value, including null.
pub fn path_exists(doc: &Value, path: &str) -> bool {
    get_path(doc, path).is_some()
}
