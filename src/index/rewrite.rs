//! Transaction-time index rewriting
//!
//! Normalizes index specs on versioned collections:
//!
//! 1. a key already containing `transaction_end` passes through unchanged;
//! 2. a key containing `transaction` with direction `0` drops that entry
//!    (explicit opt-out of the automatic prefix);
//! 3. a key containing `transaction` with any other direction renames the
//!    entry to `transaction_end` in place, preserving direction;
//! 4. otherwise `transaction_end: 1` is prepended.
//!
//! With `transaction_end` leading, the current-version criterion is a
//! prefix-equality lookup on every such index.

use crate::document::TRANSACTION_END;
use crate::query::TRANSACTION_OPERATOR;

use super::spec::{IndexKey, IndexSpec};

/// Rewrites an index spec for a versioned collection.
pub fn modify_transaction_time_index(spec: &IndexSpec) -> IndexSpec {
    if spec.covers(TRANSACTION_END) {
        return spec.clone();
    }

    if spec.covers(TRANSACTION_OPERATOR) {
        let keys = spec
            .keys
            .iter()
            .filter(|key| !(key.field == TRANSACTION_OPERATOR && key.order == 0))
            .map(|key| {
                if key.field == TRANSACTION_OPERATOR {
                    IndexKey::with_order(TRANSACTION_END, key.order)
                } else {
                    key.clone()
                }
            })
            .collect();
        return IndexSpec::new(spec.name.clone(), keys);
    }

    let mut keys = Vec::with_capacity(spec.keys.len() + 1);
    keys.push(IndexKey::asc(TRANSACTION_END));
    keys.extend(spec.keys.iter().cloned());
    IndexSpec::new(spec.name.clone(), keys)
}
