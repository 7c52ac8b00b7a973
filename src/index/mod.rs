//! Index definitions for versioned collections
//!
//! Index keys are ordered; the rewriter guarantees that an index on a
//! versioned collection can serve the single most common predicate -
//! `transaction_end: null` for current-version reads - as a prefix-equality
//! lookup, unless the user explicitly opts out.

mod rewrite;
mod spec;

pub use rewrite::modify_transaction_time_index;
pub use spec::{IndexKey, IndexSpec};
