//! Update pipeline for versioned collections
//!
//! One executor instance serves one client operation at a time. For a
//! versioned collection every logical mutation becomes a
//! close-old-version + insert-new-version pair:
//!
//! 1. normalize the selector so only current versions can match;
//! 2. locate a matching record through the cursor;
//! 3. stamp `transaction_end` on the existing record, in place;
//! 4. insert the successor as a new record;
//! 5. emit the close delta and the successor to the oplog sink.
//!
//! Multi-updates track the locations they have produced (the seen set) so
//! the operation never re-fires on its own inserts. Between logical
//! mutations the executor may yield: collection metadata is re-resolved
//! through the catalog, modifier index coverage is re-checked, and a pending
//! cancellation stops the operation with its partial count.

mod cursor;
mod errors;
mod modifier;
mod read;
mod result;
mod update;

pub use cursor::{CancellationToken, CollectionCursor, YieldPolicy};
pub use errors::{ExecutorError, ExecutorResult};
pub use modifier::ModSet;
pub use result::UpdateOutcome;
pub use update::{UpdateExecutor, UpdateOptions, MAX_DOCUMENT_BYTES};
