use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use std::time::Duration;

/// A duration in nanoseconds. The underlying type is a u64 and is always
/// positive to simplify reasoning on the user side.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TfDuration(pub u64);

impl TfDuration {
    pub const ZERO: Self = TfDuration(0);

    pub const fn from_secs(secs: u64) -> Self {
        TfDuration(secs * 1_000_000_000)
    }

    pub const fn from_millis(millis: u64) -> Self {
        TfDuration(millis * 1_000_000)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    pub const fn saturating_sub(self, rhs: Self) -> Self {
        TfDuration(self.0.saturating_sub(rhs.0))
    }

    /// Absolute distance between two instants.
    pub const fn abs_diff(self, rhs: Self) -> Self {
        TfDuration(self.0.abs_diff(rhs.0))
    }
}

impl From<Duration> for TfDuration {
    fn from(duration: Duration) -> Self {
        TfDuration(duration.as_nanos() as u64)
    }
}

impl From<TfDuration> for Duration {
    fn from(duration: TfDuration) -> Self {
        Duration::from_nanos(duration.0)
    }
}

impl From<u64> for TfDuration {
    fn from(nanos: u64) -> Self {
        TfDuration(nanos)
    }
}

impl From<TfDuration> for u64 {
    fn from(duration: TfDuration) -> Self {
        duration.0
    }
}

impl Add for TfDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        TfDuration(self.0 + rhs.0)
    }
}

impl Sub for TfDuration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        TfDuration(self.0 - rhs.0)
    }
}

impl Display for TfDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let nanos = self.0;
        if nanos >= 1_000_000_000 {
            write!(f, "{:.3} s", nanos as f64 / 1_000_000_000.0)
        } else if nanos >= 1_000_000 {
            write!(f, "{:.3} ms", nanos as f64 / 1_000_000.0)
        } else if nanos >= 1_000 {
            write!(f, "{:.3} µs", nanos as f64 / 1_000.0)
        } else {
            write!(f, "{nanos} ns")
        }
    }
}

/// A timestamp is a duration from a fixed (application-defined) origin.
pub type TfTime = TfDuration;

/// Closed time interval covered by a buffer's retained samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfTimeRange {
    pub start: TfTime,
    pub end: TfTime,
}
