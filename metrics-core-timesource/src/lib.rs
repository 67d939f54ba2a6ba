// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

//! The metric primitives in `metrics-core` (EWMA, meter, sliding-window
//! reservoir) are generic over a monotonic [`Clock`] rather than calling
//! [`std::time::Instant::now`] directly, so that their decay logic can be
//! driven deterministically in tests.

use std::fmt::Debug;
use std::ops::Sub;
use std::time::{Duration, Instant as StdInstant};

#[cfg(feature = "test-util")]
pub mod fakes;

/// A monotonic point in time, as produced by a [`Clock`].
///
/// This wraps [`std::time::Instant`] rather than re-exporting it directly
/// so that fake clocks (see [`fakes::ManualClock`]) can hand out points
/// that are not tied to the OS's notion of "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(StdInstant);

impl Instant {
    /// Wrap a [`std::time::Instant`].
    pub fn from_std(instant: StdInstant) -> Self {
        Self(instant)
    }

    /// Unwrap to a [`std::time::Instant`].
    pub fn as_std(&self) -> StdInstant {
        self.0
    }

    /// Saturating duration since an earlier instant.
    ///
    /// This never panics even if `earlier` is actually later (which can
    /// happen across a clock-skew boundary on fake clocks); in that case
    /// it returns [`Duration::ZERO`].
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

impl Sub for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl std::ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0 + rhs)
    }
}

/// A source of monotonic time.
///
/// Implementors must be cheap to call on the hot instrumentation path
/// (`mark`, `update`, `rate`) — no locking beyond what's strictly needed
/// to read the current point, and no allocation.
pub trait Clock: Send + Sync + Debug {
    /// The current monotonic point in time.
    fn now(&self) -> Instant;
}

/// The default [`Clock`], backed by [`std::time::Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::from_std(StdInstant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn duration_since_saturates_on_skew() {
        let a = Instant::from_std(StdInstant::now());
        let b = a + Duration::from_secs(1);
        assert_eq!(a.saturating_duration_since(b), Duration::ZERO);
        assert_eq!(b.saturating_duration_since(a), Duration::from_secs(1));
    }
}
