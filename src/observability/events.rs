//! Observable events of the versioning pipeline
//!
//! Events are explicit and typed; the stable names below are the log
//! contract.

use std::fmt;

/// Events emitted by the catalog and the update pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A collection was registered.
    CollectionCreate,
    /// A collection was dropped.
    CollectionDrop,
    /// An index spec was rewritten and registered.
    IndexCreate,
    /// An index build started in the background.
    IndexBuildStart,
    /// A background index build finished.
    IndexBuildFinish,
    /// A current version was closed.
    VersionClose,
    /// A successor version was inserted.
    VersionInsert,
    /// A multi-update yielded between mutations.
    UpdateYield,
    /// A cooperative cancellation stopped an operation.
    UpdateCancelled,
    /// An upsert inserted a fresh document.
    Upsert,
}

impl Event {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::CollectionCreate => "collection_create",
            Event::CollectionDrop => "collection_drop",
            Event::IndexCreate => "index_create",
            Event::IndexBuildStart => "index_build_start",
            Event::IndexBuildFinish => "index_build_finish",
            Event::VersionClose => "version_close",
            Event::VersionInsert => "version_insert",
            Event::UpdateYield => "update_yield",
            Event::UpdateCancelled => "update_cancelled",
            Event::Upsert => "upsert",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
