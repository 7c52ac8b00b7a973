//! OpTime - totally ordered transaction-time stamp
//!
//! An `OpTime` is a `(sec, inc)` pair: wall-clock seconds plus a per-second
//! counter. The derived ordering is lexicographic, which matches issuance
//! order because the clock source never lets `sec` regress.
//!
//! Inside documents an OpTime is encoded in extended-JSON form:
//! `{"$timestamp": {"t": <sec>, "i": <inc>}}`. The open end of a current
//! version is plain JSON `null`, never a sentinel OpTime.

use serde_json::{json, Value};

/// Extended-JSON wrapper key for an encoded OpTime.
pub const TIMESTAMP_KEY: &str = "$timestamp";

/// A strictly ordered transaction-time stamp.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OpTime {
    sec: u32,
    inc: u32,
}

impl OpTime {
    /// Creates an OpTime from wall-clock seconds and a per-second counter.
    #[inline]
    pub fn new(sec: u32, inc: u32) -> Self {
        Self { sec, inc }
    }

    /// Returns the wall-clock seconds component.
    #[inline]
    pub fn sec(&self) -> u32 {
        self.sec
    }

    /// Returns the per-second counter component.
    #[inline]
    pub fn inc(&self) -> u32 {
        self.inc
    }

    /// Encodes this stamp in its extended-JSON document form.
    pub fn to_value(&self) -> Value {
        json!({ TIMESTAMP_KEY: { "t": self.sec, "i": self.inc } })
    }

    /// Decodes a stamp from its extended-JSON document form.
    ///
    /// Returns None for anything that is not a well-formed
    /// `{"$timestamp": {"t": ..., "i": ...}}` object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let wrapper = value.as_object()?;
        if wrapper.len() != 1 {
            return None;
        }
        let body = wrapper.get(TIMESTAMP_KEY)?.as_object()?;
        let sec = body.get("t")?.as_u64()?;
        let inc = body.get("i")?.as_u64()?;
        if sec > u64::from(u32::MAX) || inc > u64::from(u32::MAX) {
            return None;
        }
        Some(Self::new(sec as u32, inc as u32))
    }

    /// Returns true if the value is an encoded OpTime.
    pub fn is_timestamp(value: &Value) -> bool {
        Self::from_value(value).is_some()
    }
}

impl std::fmt::Display for OpTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Timestamp({}, {})", self.sec, self.inc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(OpTime::new(1, 9) < OpTime::new(2, 0));
        assert!(OpTime::new(2, 0) < OpTime::new(2, 1));
        assert_eq!(OpTime::new(3, 3), OpTime::new(3, 3));
    }

    #[test]
    fn test_value_round_trip() {
        let ts = OpTime::new(789456, 1);
        let encoded = ts.to_value();
        assert_eq!(OpTime::from_value(&encoded), Some(ts));
    }

    #[test]
    fn test_from_value_rejects_non_timestamps() {
        assert_eq!(OpTime::from_value(&json!(null)), None);
        assert_eq!(OpTime::from_value(&json!(42)), None);
        assert_eq!(OpTime::from_value(&json!({"t": 1, "i": 2})), None);
        // Extra sibling keys disqualify the wrapper.
        assert_eq!(
            OpTime::from_value(&json!({"$timestamp": {"t": 1, "i": 2}, "x": 1})),
            None
        );
    }

    #[test]
    fn test_is_timestamp() {
        assert!(OpTime::is_timestamp(&OpTime::new(5, 0).to_value()));
        assert!(!OpTime::is_timestamp(&json!({"sec": 5})));
    }
}
