//! Expiry predicate synthesis
//!
//! An expiry index may hold either a millisecond date value or a
//! second-granularity timestamp in the same field, so the predicate is a
//! disjunction covering both encodings: `$lt` over the millisecond cutoff
//! and `$tlt` over the timestamp cutoff. Pure functions, no state.

use chrono::Utc;
use serde_json::{json, Value};

use crate::clock::OpTime;

/// Builds the expiry predicate for `field` with an explicit reference
/// instant (milliseconds since the epoch).
pub fn expiry_query_at(field: &str, expire_after_secs: i64, now_ms: i64) -> Value {
    let cutoff_ms = now_ms - expire_after_secs * 1000;
    let cutoff_secs = (now_ms / 1000 - expire_after_secs).clamp(0, i64::from(u32::MAX)) as u32;
    json!({
        "$or": [
            { field: { "$lt": cutoff_ms } },
            { field: { "$tlt": OpTime::new(cutoff_secs, 0).to_value() } },
        ]
    })
}

/// Builds the expiry predicate for `field` against the current wall clock.
pub fn expiry_query(field: &str, expire_after_secs: i64) -> Value {
    expiry_query_at(field, expire_after_secs, Utc::now().timestamp_millis())
}
