//! ClockSource - serialized monotonic stamp issuance
//!
//! A single ClockSource is shared by every executor in the process. Stamps
//! are handed out under a mutex, so for any two successful calls `a` before
//! `b`, `a < b` holds. A caller that persists a stamp must complete the
//! persistence within its own operation before yielding control, so a replay
//! can never reuse the stamp.
//!
//! Wall-clock regressions are absorbed: `sec` is held at its high-water mark
//! and the per-second counter keeps increasing.

use std::sync::Mutex;

use chrono::Utc;

use super::OpTime;

enum TickMode {
    /// Stamps follow the wall clock.
    Wall,
    /// Stamps advance only by counter; for deterministic tests.
    Fixed,
}

/// Process-wide source of strictly increasing OpTimes.
pub struct ClockSource {
    mode: TickMode,
    last: Mutex<OpTime>,
}

impl ClockSource {
    /// Creates a wall-clock backed source.
    pub fn new() -> Self {
        Self {
            mode: TickMode::Wall,
            last: Mutex::new(OpTime::new(0, 0)),
        }
    }

    /// Creates a deterministic source starting just after `start`.
    ///
    /// Every call to `now` advances the counter by exactly one, which makes
    /// interval arithmetic in tests reproducible.
    pub fn fixed(start: OpTime) -> Self {
        Self {
            mode: TickMode::Fixed,
            last: Mutex::new(start),
        }
    }

    /// Issues the next stamp. Strictly greater than every stamp issued before.
    pub fn now(&self) -> OpTime {
        let mut last = self.last.lock().expect("clock serialization poisoned");
        let candidate = match self.mode {
            TickMode::Wall => OpTime::new(Utc::now().timestamp() as u32, 0),
            TickMode::Fixed => OpTime::new(last.sec(), last.inc() + 1),
        };
        let next = if candidate > *last {
            candidate
        } else {
            OpTime::new(last.sec(), last.inc() + 1)
        };
        *last = next;
        next
    }

    /// Returns the most recently issued stamp without advancing.
    pub fn last_issued(&self) -> OpTime {
        *self.last.lock().expect("clock serialization poisoned")
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::new()
    }
}
