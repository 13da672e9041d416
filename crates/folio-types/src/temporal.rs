use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock reading in milliseconds since the UNIX epoch.
///
/// Persisted as a bare JSON number under the record's `timestamp` key.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from raw milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(wall_clock_ms())
    }

    /// Raw milliseconds since the UNIX epoch.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly increasing timestamp source.
///
/// Each [`tick`](Self::tick) returns `max(wall_clock, last + 1)`, so readings
/// never repeat and never go backwards even when several are taken within the
/// same millisecond or the wall clock is stepped back. Safe for concurrent use.
pub struct MonotonicClock {
    last_ms: Mutex<u64>,
}

impl MonotonicClock {
    /// Create a clock with no prior readings.
    pub fn new() -> Self {
        Self {
            last_ms: Mutex::new(0),
        }
    }

    /// Produce a timestamp strictly greater than every earlier one.
    pub fn tick(&self) -> Timestamp {
        let wall = wall_clock_ms();
        let mut last = self.last_ms.lock().unwrap_or_else(PoisonError::into_inner);
        let next = wall.max(last.saturating_add(1));
        *last = next;
        Timestamp(next)
    }

    /// Record an externally observed timestamp so later ticks land after it.
    pub fn observe(&self, seen: Timestamp) {
        let mut last = self.last_ms.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.0 > *last {
            *last = seen.0;
        }
    }

    /// The most recent reading handed out or observed.
    pub fn last(&self) -> Timestamp {
        Timestamp(*self.last_ms.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("last", &self.last())
            .finish()
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
