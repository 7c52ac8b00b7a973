//! Temporal criteria rewriting
//!
//! Translates the user-facing `transaction` operator into predicates over
//! the interval fields. The operator is stripped from the output in every
//! branch; the rewritten criterion is inserted first and user fields are
//! merged in afterwards without overriding it.
//!
//! Subforms, first match wins:
//!
//! | form               | rewrite                                          |
//! |--------------------|--------------------------------------------------|
//! | absent             | `transaction_end: null`                          |
//! | `{current: true}`  | `transaction_end: null`                          |
//! | `{inrange: [a,b]}` | versions overlapping `[a, b]`                    |
//! | `{at: t}`          | `inrange: [t, t]`                                |
//! | `{all: true}`      | no predicate                                     |
//!
//! A plain top-level `_id` equality is rewritten to `_id._id` so user
//! queries keep addressing logical documents after their ids were wrapped
//! into composite version ids.

use serde_json::{json, Map, Value};

use crate::clock::OpTime;
use crate::document::{ID_FIELD, TRANSACTION_END, TRANSACTION_START, TRANSACTION_START_PATH, USER_ID_PATH};

use super::errors::{QueryError, QueryResult};

/// Top-level selector key recognized as the version-selection operator.
pub const TRANSACTION_OPERATOR: &str = "transaction";

/// Rewrites a read selector, translating the `transaction` operator.
pub fn add_temporal_criteria(selector: &Value) -> QueryResult<Value> {
    let fields = as_selector_object(selector);
    let mut out = Map::new();

    match fields.get(TRANSACTION_OPERATOR) {
        None => {
            out.insert(TRANSACTION_END.to_string(), Value::Null);
        }
        Some(Value::Object(spec)) => {
            if let Some(flag) = spec.get("current") {
                require_true(flag, "current")?;
                out.insert(TRANSACTION_END.to_string(), Value::Null);
            } else if let Some(bounds) = spec.get("inrange") {
                let (from, to) = decode_range(bounds)?;
                append_range(&mut out, from, to);
            } else if let Some(at) = spec.get("at") {
                let stamp = decode_bound(at)?.ok_or(QueryError::BadRangeBounds(
                    "at requires a timestamp instant",
                ))?;
                append_range(&mut out, Some(stamp), Some(stamp));
            } else if let Some(flag) = spec.get("all") {
                require_true(flag, "all")?;
            } else {
                return Err(QueryError::BadTransactionSelector);
            }
        }
        Some(_) => return Err(QueryError::BadTransactionSelector),
    }

    merge_user_fields(&mut out, &fields);
    Ok(Value::Object(out))
}

/// Normalizes a write selector so it can only match current versions.
///
/// Refuses selectors that explicitly constrain `transaction_end` to anything
/// other than null: such a write would mutate a historical record.
pub fn add_current_version_criterion(selector: &Value) -> QueryResult<Value> {
    let fields = as_selector_object(selector);

    if let Some(end) = fields.get(TRANSACTION_END) {
        if !end.is_null() {
            return Err(QueryError::HistoricalWrite);
        }
    }

    let mut out = Map::new();
    out.insert(TRANSACTION_END.to_string(), Value::Null);
    merge_user_fields(&mut out, &fields);
    Ok(Value::Object(out))
}

fn as_selector_object(selector: &Value) -> Map<String, Value> {
    match selector.as_object() {
        Some(map) => map.clone(),
        None => Map::new(),
    }
}

fn require_true(flag: &Value, name: &'static str) -> QueryResult<()> {
    match flag {
        Value::Bool(true) => Ok(()),
        _ => Err(QueryError::BadFlagValue(name)),
    }
}

/// Decodes one `inrange` bound: null means open, otherwise a timestamp.
fn decode_bound(bound: &Value) -> QueryResult<Option<OpTime>> {
    match bound {
        Value::Null => Ok(None),
        other => OpTime::from_value(other)
            .map(Some)
            .ok_or(QueryError::BadRangeBounds("bound is not a timestamp")),
    }
}

fn decode_range(bounds: &Value) -> QueryResult<(Option<OpTime>, Option<OpTime>)> {
    let pair = bounds
        .as_array()
        .ok_or(QueryError::BadRangeBounds("inrange requires an array"))?;
    if pair.len() != 2 {
        return Err(QueryError::BadRangeBounds(
            "inrange requires exactly two bounds",
        ));
    }
    let from = decode_bound(&pair[0])?;
    let to = decode_bound(&pair[1])?;
    if from.is_none() && to.is_none() {
        return Err(QueryError::BadRangeBounds(
            "at least one bound must be non-null",
        ));
    }
    Ok((from, to))
}

/// Appends the overlap predicate for `[from, to]`: a version overlaps the
/// range when it had not ended before `from` and had started by `to`.
fn append_range(out: &mut Map<String, Value>, from: Option<OpTime>, to: Option<OpTime>) {
    if let Some(from) = from {
        out.insert(
            "$or".to_string(),
            json!([
                { TRANSACTION_END: { "$gte": from.to_value() } },
                { TRANSACTION_END: Value::Null },
            ]),
        );
    }
    if let Some(to) = to {
        out.insert(
            TRANSACTION_START_PATH.to_string(),
            json!({ "$lte": to.to_value() }),
        );
    }
}

/// Copies user fields into the rewritten selector. The criterion was
/// inserted first and wins over duplicate keys, mirroring how the original
/// pattern is merged uniquely behind the injected predicate.
fn merge_user_fields(out: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, value) in fields {
        if key == TRANSACTION_OPERATOR {
            continue;
        }
        let key = rewrite_user_id_key(key, value);
        if !out.contains_key(&key) {
            out.insert(key, value.clone());
        }
    }
}

/// Maps a plain `_id` constraint onto the embedded user id. An exact
/// composite version id (an object carrying `transaction_start`) is left
/// addressing the full `_id`.
fn rewrite_user_id_key(key: &str, value: &Value) -> String {
    if key != ID_FIELD {
        return key.to_string();
    }
    let is_composite = value
        .as_object()
        .map(|map| map.contains_key(TRANSACTION_START))
        .unwrap_or(false);
    if is_composite {
        key.to_string()
    } else {
        USER_ID_PATH.to_string()
    }
}
