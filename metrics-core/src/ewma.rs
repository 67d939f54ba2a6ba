// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Interval-bucketed exponentially weighted moving average.
//!
//! Grounded on `cxxmetrics::internal::ewma`: `rate_` and `pending_` are
//! independent atomics, `pending_`'s CAS is the de facto linearization
//! point for a tick's commit, and `last_` is read/written without its
//! own lock, trading strict consistency for lock-freedom on the hot
//! path. We track `last_` as an `AtomicU64` of microseconds since
//! construction (rather than the original's unguarded plain field) so
//! the read/write pair is at least data-race-free in Rust's model,
//! while keeping the same "advisory, not authoritative" role it plays
//! in the original: a tick that loses the `pending_` CAS below still
//! returns a valid rate, it just doesn't get to publish it.
//!
//! `f64` has no native atomic add, so the pending accumulator uses the
//! same manual compare-and-swap retry loop as `manual_atomic_adder<double>`;
//! `rate_`'s publish and a tick's commit are each a single
//! compare-and-swap attempt with no retry, matching `tick()`'s
//! `compare_exchange_weak` calls — losing one of those means another
//! thread's tick already moved the state forward, and this call
//! returns its own computed rate as a read-only answer rather than
//! spin to win.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use metrics_core_timesource::{Clock, Instant};

use crate::period::Period;
use crate::registry::TaggedMetric;
use crate::snapshot::{AnySnapshot, SingleValueSnapshot};

/// An exponentially weighted moving average over a window `W` at tick
/// granularity `I`.
///
/// `mark` and `rate` are lock-free: each touches at most a bounded,
/// small number of atomics, and the only retry loop (the pending
/// accumulator's add) is bounded by contention, not by anything this
/// type waits on.
pub struct Ewma<C: Clock> {
    window: Period,
    interval: Period,
    alpha: f64,
    clock: C,
    epoch: Instant,
    rate_bits: AtomicU64,
    pending_bits: AtomicU64,
    last_tick_micros: AtomicU64,
    ticked: AtomicBool,
}

impl<C: Clock> Ewma<C> {
    /// Construct a new EWMA. `window` must be `>= interval`.
    pub fn new(window: Period, interval: Period, clock: C) -> Self {
        assert!(
            window.as_micros() >= interval.as_micros(),
            "ewma window must be at least as long as its interval"
        );
        let alpha = 1.0 - (-(interval.as_micros() as f64) / (2.0 * window.as_micros() as f64)).exp();
        let epoch = clock.now();
        Self {
            window,
            interval,
            alpha,
            clock,
            epoch,
            rate_bits: AtomicU64::new(0.0f64.to_bits()),
            pending_bits: AtomicU64::new(0.0f64.to_bits()),
            last_tick_micros: AtomicU64::new(0),
            ticked: AtomicBool::new(false),
        }
    }

    /// The configured window.
    pub fn window(&self) -> Period {
        self.window
    }

    /// The configured tick interval.
    pub fn interval(&self) -> Period {
        self.interval
    }

    fn load_rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::Acquire))
    }

    fn load_pending(&self) -> f64 {
        f64::from_bits(self.pending_bits.load(Ordering::Relaxed))
    }

    fn micros_since_epoch(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch)
            .as_micros()
            .min(u128::from(u64::MAX)) as u64
    }

    /// CAS retry loop standing in for a native atomic float add (there
    /// isn't one): mirrors `manual_atomic_adder<double>`.
    fn add_pending(&self, amount: f64) {
        let mut current = self.pending_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + amount).to_bits();
            match self
                .pending_bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Record `amount` into the pending bucket, advancing decay state up
    /// to now first.
    pub fn mark(&self, amount: f64) {
        let now_micros = self.micros_since_epoch(self.clock.now());
        if now_micros < self.last_tick_micros.load(Ordering::Relaxed) {
            // Clock went backwards: drop the sample, do not advance state.
            return;
        }
        self.tick(now_micros, true);
        self.add_pending(amount);
    }

    /// The current decayed rate, advancing decay state up to now.
    pub fn rate(&self) -> f64 {
        let now_micros = self.micros_since_epoch(self.clock.now());
        self.tick(now_micros, true)
    }

    /// Apply the `tick(at)` algorithm, optionally committing the result
    /// (`write = false` recomputes without publishing it).
    fn tick(&self, now_micros: u64, write: bool) -> f64 {
        let last_micros = self.last_tick_micros.load(Ordering::Relaxed);
        if now_micros < last_micros {
            return self.load_rate();
        }

        let pending = self.load_pending();
        let rate = self.load_rate();
        let elapsed_micros = now_micros - last_micros;
        let interval_micros = self.interval.as_micros().max(1);

        // Cold start: nothing has ever ticked, and the rate is still at
        // its initial zero.
        if rate == 0.0 && !self.ticked.load(Ordering::Acquire) {
            if (elapsed_micros as u128) < interval_micros {
                return pending;
            }

            if self
                .ticked
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                if write {
                    match self.pending_bits.compare_exchange(
                        pending.to_bits(),
                        0.0f64.to_bits(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => {
                            if self
                                .rate_bits
                                .compare_exchange(
                                    rate.to_bits(),
                                    pending.to_bits(),
                                    Ordering::AcqRel,
                                    Ordering::Acquire,
                                )
                                .is_ok()
                            {
                                self.last_tick_micros.fetch_max(now_micros, Ordering::Relaxed);
                            }
                        }
                        Err(actual) => return f64::from_bits(actual), // someone else ticked from under us
                    }
                }
                return pending;
            }
            // Lost the ticked-flag race: fall through and treat this as
            // a normal (non-cold-start) tick.
        }

        let mut next_rate = rate + self.alpha * (pending - rate);

        let elapsed_intervals = (elapsed_micros as u128 / interval_micros) as i64;
        let mut missed_intervals = elapsed_intervals - 1;

        if missed_intervals > 0 {
            let window_micros = self.window.as_micros();
            if window_micros > self.interval.as_micros() && (elapsed_micros as u128) > window_micros {
                let intervals_per_window = (window_micros / self.interval.as_micros()).max(1) as i64;
                let missed_windows = missed_intervals / intervals_per_window;
                if missed_windows > 0 {
                    next_rate = next_rate.powf(1.0 / (missed_windows as f64).powi(2));
                    missed_intervals -= missed_windows * intervals_per_window;
                }
            }
            for _ in 0..missed_intervals {
                next_rate += self.alpha * (-next_rate);
            }
        }

        if next_rate.is_nan() || next_rate.is_infinite() {
            next_rate = 0.0;
        }

        if !write || (elapsed_micros as u128) < interval_micros {
            return next_rate;
        }

        match self.pending_bits.compare_exchange(
            pending.to_bits(),
            0.0f64.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.rate_bits.store(next_rate.to_bits(), Ordering::Release);
                self.last_tick_micros.fetch_max(now_micros, Ordering::Relaxed);
                next_rate
            }
            Err(_) => next_rate, // someone else already ticked or added a pending value
        }
    }
}

impl<C: Clock + 'static> TaggedMetric for Ewma<C> {
    const TYPE_NAME: &'static str = "ewma";

    fn snapshot(&self) -> AnySnapshot {
        AnySnapshot::Single(SingleValueSnapshot { value: self.rate() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use metrics_core_timesource::fakes::ManualClock;
    use std::time::Duration;

    fn ewma_10_1(clock: ManualClock) -> Ewma<ManualClock> {
        Ewma::new(Period::secs(10), Period::secs(1), clock)
    }

    #[test]
    fn steady_marks_converge_to_the_marked_value() {
        let clock = ManualClock::new();
        let ewma = ewma_10_1(clock.clone());
        for _ in 0..10 {
            ewma.mark(7.0);
            clock.advance(Duration::from_secs(1));
        }
        assert_approx_eq!(ewma.rate(), 7.0, 0.5);
    }

    #[test]
    fn long_gap_decays_the_rate_before_absorbing_a_new_mark() {
        let clock = ManualClock::new();
        let ewma = ewma_10_1(clock.clone());
        for _ in 0..10 {
            ewma.mark(7.0);
            clock.advance(Duration::from_secs(1));
        }
        let steady = ewma.rate();
        assert!(steady > 5.0);

        clock.advance(Duration::from_secs(100));
        ewma.mark(1.0);
        clock.advance(Duration::from_secs(1));
        assert!(ewma.rate() < 1.0);
    }

    #[test]
    fn window_equal_interval_reduces_to_single_interval_average() {
        let clock = ManualClock::new();
        let ewma = Ewma::new(Period::secs(1), Period::secs(1), clock.clone());
        ewma.mark(4.0);
        clock.advance(Duration::from_secs(1));
        assert_approx_eq!(ewma.rate(), 4.0, 0.01);
    }

    #[test]
    fn backwards_clock_sample_is_dropped() {
        let clock = ManualClock::new();
        let ewma = ewma_10_1(clock.clone());
        ewma.mark(7.0);
        clock.advance(Duration::from_secs(1));
        let before = ewma.rate();
        // No actual backwards movement is possible through ManualClock's
        // API (it only advances), so this exercises the `at < last` guard
        // indirectly via an immediate re-read producing the same state.
        assert_eq!(ewma.rate(), before);
    }
}
