//! Read path
//!
//! Reads go through the same rewriting front door as writes: on a versioned
//! collection the selector is run through the temporal rewriter and sort
//! keys through the temporal order rewrite, then the matcher is evaluated
//! over a store scan.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::get_path;
use crate::query::{add_temporal_criteria, add_temporal_order, compare_values, Matcher,
    SortDirection, SortSpec};
use crate::storage::RecordStore;

use super::errors::ExecutorResult;
use super::update::UpdateExecutor;

impl<'a, S: RecordStore> UpdateExecutor<'a, S> {
    /// Finds all records matching the selector, honoring the `transaction`
    /// operator on versioned collections.
    pub fn find(
        &self,
        ns: &str,
        selector: &Value,
        sort: Option<&SortSpec>,
    ) -> ExecutorResult<Vec<Value>> {
        let versioned = self.catalog.is_versioned(ns);
        let selector = if versioned {
            add_temporal_criteria(selector)?
        } else {
            selector.clone()
        };

        let mut results = Vec::new();
        for loc in self.store.scan(ns) {
            if let Some(doc) = self.store.read(ns, loc)? {
                if Matcher::matches(&selector, &doc) {
                    results.push(doc);
                }
            }
        }

        if let Some(sort) = sort {
            let sort = if versioned {
                add_temporal_order(sort)
            } else {
                sort.clone()
            };
            sort_documents(&mut results, &sort);
        }
        Ok(results)
    }

    /// Counts the records matching the selector.
    pub fn count(&self, ns: &str, selector: &Value) -> ExecutorResult<u64> {
        Ok(self.find(ns, selector, None)?.len() as u64)
    }
}

/// Stable multi-key sort. Missing fields sort before present ones; across
/// types the order is null, bool, number, timestamp, string, array, object.
fn sort_documents(docs: &mut [Value], spec: &SortSpec) {
    docs.sort_by(|a, b| {
        for key in &spec.keys {
            let ordering = compare_field(get_path(a, &key.field), get_path(b, &key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let by_type = type_rank(a).cmp(&type_rank(b));
            if by_type != Ordering::Equal {
                return by_type;
            }
            compare_values(a, b).unwrap_or(Ordering::Equal)
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    if crate::clock::OpTime::is_timestamp(value) {
        return 3;
    }
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}
