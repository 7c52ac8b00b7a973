//! Observability for the versioning pipeline
//!
//! Structured, synchronous, single-line JSON logs with deterministic key
//! ordering, over a typed event vocabulary. One log line = one event.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
