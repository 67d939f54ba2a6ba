// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A histogram: a reservoir plus a lifetime update count.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::TaggedMetric;
use crate::reservoir::Reservoir;
use crate::snapshot::{AnySnapshot, HistogramSnapshot};

/// A histogram over a pluggable [`Reservoir`].
pub struct Histogram<R: Reservoir> {
    reservoir: R,
    count: AtomicU64,
}

impl<R: Reservoir> Histogram<R> {
    /// Wrap an existing reservoir (moved in).
    pub fn new(reservoir: R) -> Self {
        Self {
            reservoir,
            count: AtomicU64::new(0),
        }
    }

    /// Record a value: increments the lifetime count and forwards to
    /// the reservoir.
    pub fn update(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.reservoir.update(value);
    }

    /// The lifetime update count (may exceed the reservoir's resident
    /// sample count once the reservoir is at capacity).
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// A point-in-time snapshot of the reservoir plus the lifetime count.
    pub fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot::new(self.reservoir.snapshot(), self.count())
    }
}

impl<R: Reservoir + 'static> TaggedMetric for Histogram<R> {
    const TYPE_NAME: &'static str = "histogram";

    fn snapshot(&self) -> AnySnapshot {
        AnySnapshot::Histogram(Histogram::snapshot(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservoir::SimpleReservoir;

    #[test]
    fn count_tracks_lifetime_updates_past_capacity() {
        let histogram = Histogram::new(SimpleReservoir::new(3));
        for i in 0..10 {
            histogram.update(i as f64);
        }
        assert_eq!(histogram.count(), 10);
        assert_eq!(histogram.snapshot().reservoir.count(), 3);
    }
}
