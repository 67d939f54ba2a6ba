// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A timer: a histogram of durations plus a meter over the same marks.

use std::time::Duration;

use metrics_core_timesource::Clock;

use crate::meter::Meter;
use crate::histogram::Histogram;
use crate::period::Period;
use crate::registry::TaggedMetric;
use crate::reservoir::Reservoir;
use crate::snapshot::{AnySnapshot, TimerSnapshot};

/// A timer over a pluggable [`Reservoir`], logging durations in
/// microseconds and fanning the same marks out to a [`Meter`].
pub struct Timer<C: Clock + Clone, R: Reservoir> {
    histogram: Histogram<R>,
    meter: Meter<C>,
    clock: C,
}

impl<C: Clock + Clone, R: Reservoir> Timer<C, R> {
    /// Construct a timer: `reservoir` backs the duration histogram,
    /// `interval`/`windows` configure the call-rate meter.
    pub fn new(reservoir: R, interval: Period, windows: Vec<Period>, clock: C) -> Self {
        Self {
            histogram: Histogram::new(reservoir),
            meter: Meter::new(interval, windows, clock.clone()),
            clock,
        }
    }

    /// Log a duration: records microseconds into the histogram and marks
    /// the meter once.
    pub fn update(&self, duration: Duration) {
        self.histogram.update(duration.as_micros() as f64);
        self.meter.mark(1);
    }

    /// Measure the wall-clock duration of a fallible callable and log it
    /// only if the callable returned `Ok`.
    pub fn time<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let start = self.clock.now();
        let result = f();
        if result.is_ok() {
            self.update(self.clock.now().saturating_duration_since(start));
        }
        result
    }

    /// Measure the wall-clock duration of an infallible callable and
    /// always log it.
    pub fn time_value<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = self.clock.now();
        let value = f();
        self.update(self.clock.now().saturating_duration_since(start));
        value
    }

    /// Lifetime total number of timed calls.
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    /// A point-in-time snapshot of the duration histogram and the
    /// call-rate meter.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::new(self.histogram.snapshot(), self.meter.snapshot())
    }
}

impl<C: Clock + Clone + 'static, R: Reservoir + 'static> TaggedMetric for Timer<C, R> {
    const TYPE_NAME: &'static str = "timer";

    fn snapshot(&self) -> AnySnapshot {
        AnySnapshot::Timer(Timer::snapshot(self))
    }
}
