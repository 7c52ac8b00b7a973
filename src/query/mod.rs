//! Query surface of the versioning layer
//!
//! User selectors may carry a top-level `transaction` operator choosing which
//! versions a query sees. The rewriter translates it into pure predicates
//! over the interval fields and strips the operator; the matcher evaluates
//! rewritten selectors against stored records. Write paths normalize their
//! selectors with `add_current_version_criterion` so a mutation can only ever
//! land on current versions.

mod criteria;
mod errors;
mod matcher;
mod sort;

pub use criteria::{add_current_version_criterion, add_temporal_criteria, TRANSACTION_OPERATOR};
pub use errors::{QueryError, QueryResult};
pub use matcher::{compare_values, Matcher};
pub use sort::{add_temporal_order, SortDirection, SortKey, SortSpec};
