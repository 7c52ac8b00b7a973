//! Cursor and scheduling primitives
//!
//! The cursor walks a namespace in location order and holds nothing but its
//! position, so it survives any store mutation between steps: records
//! inserted ahead of the position are reached, records inserted behind it
//! are not revisited. Yield pacing and cancellation are owned by the
//! executor; the token is shared with the host so it can cancel a
//! long-running multi-update from outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::storage::{RecordId, RecordStore};

/// How often a multi-update offers to yield, counted in logical mutations.
#[derive(Debug, Clone, Copy)]
pub struct YieldPolicy {
    /// Mutations between yield points. Zero disables yielding.
    pub yield_every: usize,
}

impl YieldPolicy {
    /// Yields every `n` mutations.
    pub fn every(n: usize) -> Self {
        Self { yield_every: n }
    }

    /// Never yields.
    pub fn never() -> Self {
        Self { yield_every: 0 }
    }
}

impl Default for YieldPolicy {
    fn default() -> Self {
        Self { yield_every: 8 }
    }
}

/// Cooperative cancellation flag, checked at yield points only.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect at the next yield point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Position-only cursor over a namespace.
#[derive(Debug, Default)]
pub struct CollectionCursor {
    pos: Option<RecordId>,
    scanned: usize,
}

impl CollectionCursor {
    /// Creates a cursor parked before the first record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to the next location, if any.
    pub fn advance<S: RecordStore>(&mut self, store: &S, ns: &str) -> Option<RecordId> {
        let next = store.next_after(ns, self.pos)?;
        self.pos = Some(next);
        self.scanned += 1;
        Some(next)
    }

    /// Number of locations visited so far.
    pub fn scanned(&self) -> usize {
        self.scanned
    }
}
