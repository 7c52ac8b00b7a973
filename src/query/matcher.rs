//! Selector matching
//!
//! Evaluates a rewritten selector against a stored record. Entries are
//! conjunctive; `$or`/`$and` take arrays of sub-selectors. Field predicates
//! are either literal equality or an operator object
//! (`$eq`/`$ne`/`$gte`/`$gt`/`$lte`/`$lt`/`$tlt`).
//!
//! Comparison rules:
//! - encoded timestamps compare by their `(sec, inc)` order
//! - numbers compare numerically, strings lexicographically
//! - cross-type comparisons never match
//! - a null equality predicate matches a null or missing field
//! - `$tlt` matches only timestamp-encoded field values (the
//!   second-granularity arm of expiry predicates)

use std::cmp::Ordering;

use serde_json::Value;

use crate::clock::OpTime;
use crate::document::get_path;

/// Evaluates selectors against documents.
pub struct Matcher;

impl Matcher {
    /// Returns true if the document satisfies every selector entry.
    pub fn matches(selector: &Value, doc: &Value) -> bool {
        match selector {
            Value::Null => true,
            Value::Object(fields) => fields
                .iter()
                .all(|(key, predicate)| Self::matches_entry(key, predicate, doc)),
            _ => false,
        }
    }

    fn matches_entry(key: &str, predicate: &Value, doc: &Value) -> bool {
        match key {
            "$or" => match predicate.as_array() {
                Some(branches) => branches.iter().any(|branch| Self::matches(branch, doc)),
                None => false,
            },
            "$and" => match predicate.as_array() {
                Some(branches) => branches.iter().all(|branch| Self::matches(branch, doc)),
                None => false,
            },
            _ => {
                let field_value = get_path(doc, key);
                match operator_object(predicate) {
                    Some(ops) => ops
                        .iter()
                        .all(|(op, bound)| Self::matches_operator(field_value, op, bound)),
                    None => Self::eq_match(field_value, predicate),
                }
            }
        }
    }

    /// Literal equality. A null predicate also matches a missing field, so
    /// the injected `transaction_end: null` criterion keeps matching
    /// documents that never went through the version transform.
    fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
        match actual {
            Some(value) => value == expected,
            None => expected.is_null(),
        }
    }

    fn matches_operator(actual: Option<&Value>, op: &str, bound: &Value) -> bool {
        match op {
            "$eq" => Self::eq_match(actual, bound),
            "$ne" => !Self::eq_match(actual, bound),
            "$gte" | "$gt" | "$lte" | "$lt" => {
                let ordering = match actual.and_then(|value| compare_values(value, bound)) {
                    Some(ordering) => ordering,
                    None => return false,
                };
                match op {
                    "$gte" => ordering != Ordering::Less,
                    "$gt" => ordering == Ordering::Greater,
                    "$lte" => ordering != Ordering::Greater,
                    _ => ordering == Ordering::Less,
                }
            }
            "$tlt" => {
                let field = actual.and_then(OpTime::from_value);
                let bound = OpTime::from_value(bound);
                matches!((field, bound), (Some(f), Some(b)) if f < b)
            }
            // Unknown operators select nothing rather than everything.
            _ => false,
        }
    }
}

/// Distinguishes `{"$gte": ...}` operator objects from literal values. The
/// `{"$timestamp": ...}` encoding is a literal despite its `$` key.
fn operator_object(predicate: &Value) -> Option<&serde_json::Map<String, Value>> {
    let map = predicate.as_object()?;
    if map.is_empty() || OpTime::is_timestamp(predicate) {
        return None;
    }
    if map.keys().all(|key| key.starts_with('$')) {
        Some(map)
    } else {
        None
    }
}

/// Compares two document values, honoring the timestamp encoding.
/// Returns None for incomparable (cross-type) pairs.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (OpTime::from_value(a), OpTime::from_value(b)) {
        return Some(a.cmp(&b));
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
