use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time as epoch microseconds, UTC.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Instant(pub i64);

impl Instant {
    pub fn now_micros() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as i64;
        Self(micros)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }
}

// Sentinel bounds for aggregate time ranges. A fresh stream stores the
// inverted (TIME_MAX, TIME_MIN) pair, an empty range that the first real
// observation immediately narrows.
pub const TIME_MIN: Instant = Instant(i64::MIN);
pub const TIME_MAX: Instant = Instant(i64::MAX);

/// An instant or a closed interval, persisted as a start/end column pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TimeValue {
    Instant(Instant),
    Interval { start: Instant, end: Instant },
}

impl TimeValue {
    pub fn instant(micros: i64) -> Self {
        TimeValue::Instant(Instant(micros))
    }

    pub fn interval(start: i64, end: i64) -> Self {
        TimeValue::Interval {
            start: Instant(start),
            end: Instant(end),
        }
    }

    /// Column encoding; an instant stores identical bounds.
    pub fn to_bounds(&self) -> (i64, i64) {
        match self {
            TimeValue::Instant(at) => (at.0, at.0),
            TimeValue::Interval { start, end } => (start.0, end.0),
        }
    }

    /// Column decoding; equal bounds collapse to an instant, a single bound
    /// is read as an instant, and two nulls mean the value is absent.
    pub fn from_bounds(start: Option<i64>, end: Option<i64>) -> Option<TimeValue> {
        match (start, end) {
            (None, None) => None,
            (Some(at), None) | (None, Some(at)) => Some(TimeValue::instant(at)),
            (Some(start), Some(end)) if start == end => Some(TimeValue::instant(start)),
            (Some(start), Some(end)) => Some(TimeValue::interval(start, end)),
        }
    }
}
