//! Version-record document model
//!
//! A logical document is stored as a chain of version records:
//!
//! ```text
//! {
//!   _id: { _id: <user id>, transaction_start: <$timestamp> },
//!   transaction_end: <$timestamp> | null,
//!   <user fields ...>
//! }
//! ```
//!
//! Exactly one record per user id - the current version - carries a null
//! `transaction_end`; the rest are historical and immutable. This module
//! owns the record shape and the transforms that move a document into and
//! between version records. All transforms treat their input as immutable
//! and produce an owned output.

mod errors;
mod path;
mod transform;

pub use errors::{TransformError, TransformResult};
pub use path::{get_path, path_exists};
pub use transform::{
    is_version_shape, set_transaction_end, set_transaction_start, user_view, wrap_object_id,
};

/// Document identifier field.
pub const ID_FIELD: &str = "_id";

/// Start-of-interval field, nested inside the composite `_id`.
pub const TRANSACTION_START: &str = "transaction_start";

/// End-of-interval field, sibling of the composite `_id`.
pub const TRANSACTION_END: &str = "transaction_end";

/// Dotted path of the user identifier inside a version record.
pub const USER_ID_PATH: &str = "_id._id";

/// Dotted path of the interval start inside a version record.
pub const TRANSACTION_START_PATH: &str = "_id.transaction_start";
