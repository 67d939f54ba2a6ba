// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A time-windowed reservoir: a ring of `(value, timestamp)` pairs,
//! filtered to `now - window` on snapshot.
//!
//! The ring buffer's preallocated, fixed-size slot array already avoids
//! the per-update allocation an intrusive free list (§4.C's
//! [`crate::atomic_stack::AtomicStack`]) exists to amortize, so this
//! reuses [`crate::ring::RingBuffer`] directly rather than adding a
//! second recycling layer for no benefit.

use std::time::Duration;

use metrics_core_timesource::{Clock, Instant};

use crate::ring::RingBuffer;
use crate::snapshot::ReservoirSnapshot;

use super::Reservoir;

/// A reservoir retaining up to `capacity` `(value, timestamp)` pairs,
/// snapshotting only those observed within the trailing `window`.
pub struct SlidingWindowReservoir<C: Clock> {
    ring: RingBuffer<(f64, Instant)>,
    window: Duration,
    clock: C,
}

impl<C: Clock> SlidingWindowReservoir<C> {
    /// Construct a sliding-window reservoir of `capacity` slots, only
    /// counting samples within the trailing `window`.
    pub fn new(capacity: usize, window: Duration, clock: C) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            window,
            clock,
        }
    }
}

impl<C: Clock> Reservoir for SlidingWindowReservoir<C> {
    fn update(&self, value: f64) {
        self.ring.push((value, self.clock.now()));
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        let now = self.clock.now();
        let values = self
            .ring
            .iterate()
            .into_iter()
            .filter(|(_, at)| now.saturating_duration_since(*at) <= self.window)
            .map(|(value, _)| value)
            .collect();
        ReservoirSnapshot::from_unsorted(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_core_timesource::fakes::ManualClock;

    #[test]
    fn values_outside_the_window_are_excluded() {
        let clock = ManualClock::new();
        let reservoir = SlidingWindowReservoir::new(10, Duration::from_secs(5), clock.clone());
        reservoir.update(1.0);
        clock.advance(Duration::from_secs(10));
        reservoir.update(2.0);
        let snap = reservoir.snapshot();
        assert_eq!(snap.count(), 1);
        assert_eq!(snap.min(), 2.0);
    }

    #[test]
    fn values_inside_the_window_are_retained() {
        let clock = ManualClock::new();
        let reservoir = SlidingWindowReservoir::new(10, Duration::from_secs(5), clock.clone());
        reservoir.update(1.0);
        clock.advance(Duration::from_secs(2));
        reservoir.update(2.0);
        let snap = reservoir.snapshot();
        assert_eq!(snap.count(), 2);
    }
}
