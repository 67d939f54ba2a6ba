// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A meter: one mark fanned out into several EWMAs at distinct windows,
//! plus a lifetime total.
//!
//! Grounded on `cxxmetrics::meter` (partial source) and distilled spec
//! §4.F. The original deduplicates/sorts its window tuple at the type
//! level (a non-type template parameter pack) so `meter<I, 1min, 5min>`
//! and `meter<I, 5min, 1min>` name the same type. Rust's stable const
//! generics can't hold an arbitrary `[Period; N]` as a type-level value
//! in the same way, so this canonicalizes the window list at
//! construction instead, via [`crate::period::sort_dedup`] — two
//! `Meter`s built from permuted but set-equal window lists end up with
//! identical internal state and therefore the same registry type-name
//! key. See DESIGN.md's Open Question log for the full tradeoff.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics_core_timesource::{Clock, Instant};

use crate::ewma::Ewma;
use crate::period::{self, Period};
use crate::registry::TaggedMetric;
use crate::snapshot::{AnySnapshot, MeterSnapshot};

/// A fan-out of one `mark` into N EWMAs over distinct windows, plus a
/// lifetime total and a `mean()` computed over elapsed intervals.
pub struct Meter<C: Clock> {
    interval: Period,
    windows: Vec<Period>,
    ewmas: Vec<Ewma<C>>,
    total: AtomicU64,
    start: Instant,
    clock: C,
}

impl<C: Clock + Clone> Meter<C> {
    /// Construct a meter ticking at `interval`, tracking `windows`
    /// (deduplicated and sorted — order does not matter).
    pub fn new(interval: Period, windows: Vec<Period>, clock: C) -> Self {
        let windows = period::sort_dedup(windows);
        assert!(!windows.is_empty(), "a meter needs at least one window");
        let ewmas = windows
            .iter()
            .map(|&window| Ewma::new(window, interval, clock.clone()))
            .collect();
        let start = clock.now();
        Self {
            interval,
            windows,
            ewmas,
            total: AtomicU64::new(0),
            start,
            clock,
        }
    }

    /// The canonicalized (sorted, deduplicated) window list.
    pub fn windows(&self) -> &[Period] {
        &self.windows
    }

    /// Record `n` marks: advances the lifetime total and fans out to
    /// every configured window's EWMA.
    pub fn mark(&self, n: u64) {
        self.total.fetch_add(n, Ordering::Relaxed);
        for ewma in &self.ewmas {
            ewma.mark(n as f64);
        }
    }

    /// The lifetime total number of marks.
    pub fn count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// The rate for a specific window, or `None` if `window` was never
    /// configured on this meter.
    pub fn rate(&self, window: Period) -> Option<f64> {
        self.windows
            .iter()
            .position(|&w| w == window)
            .map(|idx| self.ewmas[idx].rate())
    }

    /// `total / elapsed-intervals`. If no interval has elapsed yet since
    /// construction, returns the raw total instead of a rate (preserved
    /// per design note: flagged, not fixed, for API clarity).
    pub fn mean(&self) -> f64 {
        let total = self.count() as f64;
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        let intervals = self.interval.whole_units_in(elapsed);
        if intervals == 0 {
            total
        } else {
            total / intervals as f64
        }
    }

    /// A point-in-time snapshot of `(mean, {window -> rate})`.
    pub fn snapshot(&self) -> MeterSnapshot {
        let rates = self
            .windows
            .iter()
            .zip(self.ewmas.iter())
            .map(|(&window, ewma)| (window, ewma.rate()))
            .collect();
        MeterSnapshot::new(self.mean(), self.count(), rates)
    }
}

impl<C: Clock + Clone + 'static> TaggedMetric for Meter<C> {
    const TYPE_NAME: &'static str = "meter";

    fn snapshot(&self) -> AnySnapshot {
        AnySnapshot::Meter(Meter::snapshot(self))
    }
}
