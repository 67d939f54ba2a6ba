// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Immutable, point-in-time views over a metric's derived statistics.
//!
//! Grounded on `cxxmetrics/reservoir.hpp`'s `snapshot::value()` (quantile
//! interpolation boundary conditions) and `src/snapshots.hpp` (merge
//! laws for averaged and histogram snapshots).

use crate::period::Period;

/// `v·wa + w·wb) / (wa+wb)`, the weighted-mean merge law shared by
/// [`AverageValueSnapshot`], meter rates, and histogram means.
fn weighted_merge(a_value: f64, a_weight: f64, b_value: f64, b_weight: f64) -> f64 {
    let total_weight = a_weight + b_weight;
    if total_weight == 0.0 {
        0.0
    } else {
        (a_value * a_weight + b_value * b_weight) / total_weight
    }
}

/// A single instantaneous value (gauges, counters-as-snapshot).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleValueSnapshot {
    /// The value at the moment of snapshotting.
    pub value: f64,
}

/// A cumulative value (lifetime counter totals).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumulativeValueSnapshot {
    /// The running total.
    pub total: f64,
}

/// An averaged value carrying the sample count it was computed over, so
/// two snapshots can be merged by a weighted mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageValueSnapshot {
    /// The averaged value.
    pub value: f64,
    /// How many samples contributed to `value`.
    pub samples: u64,
}

impl AverageValueSnapshot {
    /// Construct a snapshot from a single already-averaged value.
    pub fn new(value: f64, samples: u64) -> Self {
        Self { value, samples }
    }

    /// Merge two snapshots: the weighted mean of their values, and the
    /// sum of their sample counts. Commutative and associative.
    pub fn merge(a: Self, b: Self) -> Self {
        Self {
            value: weighted_merge(a.value, a.samples as f64, b.value, b.samples as f64),
            samples: a.samples + b.samples,
        }
    }
}

/// A sorted sample sequence with inclusive min/max, quantile
/// interpolation, and a count.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirSnapshot {
    /// Ascending-sorted resident values.
    values: Vec<f64>,
}

impl ReservoirSnapshot {
    /// Build a snapshot from an unsorted sample vector.
    pub fn from_unsorted(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        Self { values }
    }

    /// Number of resident samples.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// The smallest resident sample, or `i64::MIN` if empty.
    pub fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(i64::MIN as f64)
    }

    /// The largest resident sample, or `i64::MAX` if empty.
    pub fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(i64::MAX as f64)
    }

    /// The quantile `q` (`q` in `[0, 1]`) via linear interpolation on
    /// rank position `pos = q * (N + 1)`.
    pub fn quantile(&self, q: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let pos = q * (n as f64 + 1.0);
        if pos < 1.0 {
            return self.min();
        }
        if pos >= n as f64 {
            return self.max();
        }
        let i = pos.floor() as usize;
        let frac = pos - i as f64;
        let lower = self.values[i - 1];
        let upper = self.values[i];
        lower + frac * (upper - lower)
    }

    /// The numerically stable online mean
    /// `total <- total*(i/(i+1)) + v[i]*(1/(i+1))`.
    pub fn mean(&self) -> f64 {
        let mut total = 0.0;
        for (i, &v) in self.values.iter().enumerate() {
            let i = i as f64;
            total = total * (i / (i + 1.0)) + v * (1.0 / (i + 1.0));
        }
        total
    }
}

/// A meter snapshot: `(mean, {window -> rate})`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSnapshot {
    /// `total / elapsed-intervals`, or the raw total if no interval has
    /// elapsed yet.
    pub mean: f64,
    /// Lifetime total mark count, used as the merge weight.
    pub count: u64,
    rates: Vec<(Period, f64)>,
}

impl MeterSnapshot {
    /// Construct a snapshot from a precomputed mean, count, and
    /// per-window rate list.
    pub fn new(mean: f64, count: u64, rates: Vec<(Period, f64)>) -> Self {
        Self { mean, count, rates }
    }

    /// The configured windows and their rates, in the meter's
    /// canonical (sorted) order.
    pub fn rates(&self) -> &[(Period, f64)] {
        &self.rates
    }

    /// The rate at a specific window, if configured.
    pub fn rate(&self, window: Period) -> Option<f64> {
        self.rates.iter().find(|(w, _)| *w == window).map(|(_, r)| *r)
    }

    /// Merge two meter snapshots over the same window set: each rate and
    /// the mean are weighted by sample count, totals are summed.
    pub fn merge(a: &Self, b: &Self) -> Self {
        let aw = a.count as f64;
        let bw = b.count as f64;
        let mut rates = Vec::with_capacity(a.rates.len());
        for &(window, a_rate) in &a.rates {
            let b_rate = b.rate(window).unwrap_or(a_rate);
            rates.push((window, weighted_merge(a_rate, aw, b_rate, bw)));
        }
        Self {
            mean: weighted_merge(a.mean, aw, b.mean, bw),
            count: a.count + b.count,
            rates,
        }
    }
}

/// `reservoir_snapshot + count`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// The sample reservoir.
    pub reservoir: ReservoirSnapshot,
    /// Lifetime total update count (may exceed `reservoir.count()` once
    /// the reservoir is full).
    pub count: u64,
}

impl HistogramSnapshot {
    /// Construct a histogram snapshot from a reservoir and its lifetime
    /// update count.
    pub fn new(reservoir: ReservoirSnapshot, count: u64) -> Self {
        Self { reservoir, count }
    }

    /// Merge two histogram snapshots: a sorted alternating interleave of
    /// the two sample sequences (advancing whichever side has the
    /// smaller next value *not already covered by the running maximum*),
    /// capped at `max(a.count, b.count)` resident samples; counts are
    /// summed.
    ///
    /// Grounded on `cxxmetrics/snapshots.hpp`'s `alternating_iterator`:
    /// each side's cursor skips past every value `<= current` before it's
    /// considered, so the merged sequence is strictly increasing rather
    /// than a plain duplicate-keeping two-pointer merge.
    pub fn merge(a: &Self, b: &Self) -> Self {
        let cap = a.count.max(b.count) as usize;
        let (av, bv) = (&a.reservoir.values, &b.reservoir.values);
        let mut merged = Vec::with_capacity(av.len().min(cap) + bv.len().min(cap));
        let (mut i, mut j) = (0, 0);
        let mut current = f64::NEG_INFINITY;
        while merged.len() < cap {
            while i < av.len() && av[i] <= current {
                i += 1;
            }
            while j < bv.len() && bv[j] <= current {
                j += 1;
            }
            let next = match (av.get(i), bv.get(j)) {
                (Some(&x), Some(&y)) => {
                    if x <= y {
                        i += 1;
                        x
                    } else {
                        j += 1;
                        y
                    }
                }
                (Some(&x), None) => {
                    i += 1;
                    x
                }
                (None, Some(&y)) => {
                    j += 1;
                    y
                }
                (None, None) => break,
            };
            current = next;
            merged.push(next);
        }
        Self {
            reservoir: ReservoirSnapshot { values: merged },
            count: a.count + b.count,
        }
    }
}

/// `histogram_snapshot + meter_snapshot`, merged component-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    /// Duration histogram (values are nanoseconds).
    pub histogram: HistogramSnapshot,
    /// Call-rate meter over the same marks.
    pub meter: MeterSnapshot,
}

impl TimerSnapshot {
    /// Construct a timer snapshot from its two components.
    pub fn new(histogram: HistogramSnapshot, meter: MeterSnapshot) -> Self {
        Self { histogram, meter }
    }

    /// Merge two timer snapshots component-wise.
    pub fn merge(a: &Self, b: &Self) -> Self {
        Self {
            histogram: HistogramSnapshot::merge(&a.histogram, &b.histogram),
            meter: MeterSnapshot::merge(&a.meter, &b.meter),
        }
    }
}

/// How a gauge's snapshots merge across tagged permutations in
/// `aggregate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeAggregation {
    /// Merge by summing values and sample counts.
    Sum,
    /// Merge by a sample-count-weighted average.
    Average,
}

/// A gauge's point-in-time value, carrying the aggregation law its
/// registered metric should use to combine tagged permutations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeSnapshot {
    /// The value at the moment of snapshotting.
    pub value: f64,
    /// How many tagged permutations contributed to `value`.
    pub samples: u64,
    /// The merge law.
    pub aggregation: GaugeAggregation,
}

impl GaugeSnapshot {
    /// A fresh single-sample snapshot.
    pub fn new(value: f64, aggregation: GaugeAggregation) -> Self {
        Self {
            value,
            samples: 1,
            aggregation,
        }
    }

    /// Merge two snapshots per `a`'s aggregation law (both sides of one
    /// registered metric always agree on it).
    pub fn merge(a: &Self, b: &Self) -> Self {
        let samples = a.samples + b.samples;
        let value = match a.aggregation {
            GaugeAggregation::Sum => a.value + b.value,
            GaugeAggregation::Average => {
                weighted_merge(a.value, a.samples as f64, b.value, b.samples as f64)
            }
        };
        Self {
            value,
            samples,
            aggregation: a.aggregation,
        }
    }
}

/// The sealed union of every snapshot variant a registered metric can
/// produce, type-erasing across metric kinds for the registry's
/// visitor/aggregate entrypoints and the publisher facade.
///
/// Grounded on the design note on dynamic dispatch across metric kinds:
/// "model as a sealed variant ... with the registry keyed by a type-tag
/// string". `cxxmetrics` erases the *visitor* instead (placement-new into
/// an `alloca`'d buffer sized by a `registered_snapshot_visitor_builder`);
/// erasing the snapshot is the more direct translation in a language
/// with sum types and no need to dodge virtual-call overhead by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum AnySnapshot {
    /// A standalone EWMA's current rate.
    Single(SingleValueSnapshot),
    /// A counter's lifetime total.
    Cumulative(CumulativeValueSnapshot),
    /// A gauge's current value.
    Gauge(GaugeSnapshot),
    /// A meter's mean and per-window rates.
    Meter(MeterSnapshot),
    /// A reservoir's sorted samples (no lifetime count).
    Reservoir(ReservoirSnapshot),
    /// A histogram's reservoir plus lifetime count.
    Histogram(HistogramSnapshot),
    /// A timer's histogram plus call-rate meter.
    Timer(TimerSnapshot),
}

impl AnySnapshot {
    /// Merge two snapshots produced by the same registered metric (and
    /// therefore always the same variant). A standalone EWMA's `Single`
    /// snapshot has no documented merge law in the distilled spec, so it
    /// merges as an unweighted average — a decision recorded in
    /// DESIGN.md, not a promise this matches any particular publisher's
    /// expectations.
    ///
    /// Mismatched variants cannot occur through the registry (one
    /// `RegisteredMetric<T>` only ever produces one variant); if it
    /// happens anyway, the left side is kept and the mismatch is logged
    /// rather than panicking on a publisher's behalf.
    pub fn merge(&self, other: &Self) -> Self {
        match (self, other) {
            (AnySnapshot::Single(a), AnySnapshot::Single(b)) => {
                AnySnapshot::Single(SingleValueSnapshot {
                    value: (a.value + b.value) / 2.0,
                })
            }
            (AnySnapshot::Cumulative(a), AnySnapshot::Cumulative(b)) => {
                AnySnapshot::Cumulative(CumulativeValueSnapshot {
                    total: a.total + b.total,
                })
            }
            (AnySnapshot::Gauge(a), AnySnapshot::Gauge(b)) => {
                AnySnapshot::Gauge(GaugeSnapshot::merge(a, b))
            }
            (AnySnapshot::Meter(a), AnySnapshot::Meter(b)) => {
                AnySnapshot::Meter(MeterSnapshot::merge(a, b))
            }
            (AnySnapshot::Reservoir(a), AnySnapshot::Reservoir(b)) => {
                let ah = HistogramSnapshot::new(a.clone(), a.count() as u64);
                let bh = HistogramSnapshot::new(b.clone(), b.count() as u64);
                AnySnapshot::Reservoir(HistogramSnapshot::merge(&ah, &bh).reservoir)
            }
            (AnySnapshot::Histogram(a), AnySnapshot::Histogram(b)) => {
                AnySnapshot::Histogram(HistogramSnapshot::merge(a, b))
            }
            (AnySnapshot::Timer(a), AnySnapshot::Timer(b)) => {
                AnySnapshot::Timer(TimerSnapshot::merge(a, b))
            }
            (a, _) => {
                tracing::warn!(
                    "merging mismatched snapshot variants; this is a registry invariant \
                     violation, keeping the left side"
                );
                a.clone()
            }
        }
    }

    /// The short, namespace-stripped type-name a publisher should use
    /// for this snapshot's metric kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AnySnapshot::Single(_) => "ewma",
            AnySnapshot::Cumulative(_) => "counter",
            AnySnapshot::Gauge(_) => "gauge",
            AnySnapshot::Meter(_) => "meter",
            AnySnapshot::Reservoir(_) | AnySnapshot::Histogram(_) => "histogram",
            AnySnapshot::Timer(_) => "timer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn quantile_below_rank_one_is_min() {
        let snap = ReservoirSnapshot::from_unsorted(vec![10.0, 20.0, 30.0]);
        assert_eq!(snap.quantile(0.0), snap.min());
    }

    #[test]
    fn quantile_above_rank_n_is_max() {
        let snap = ReservoirSnapshot::from_unsorted(vec![10.0, 20.0, 30.0]);
        assert_eq!(snap.quantile(1.0), snap.max());
    }

    #[test]
    fn quantile_is_monotonic_nondecreasing() {
        let snap = ReservoirSnapshot::from_unsorted(vec![5.0, 1.0, 9.0, 3.0, 7.0]);
        let mut prev = snap.quantile(0.0);
        let mut q = 0.0;
        while q <= 1.0 {
            let v = snap.quantile(q);
            assert!(v >= prev - 1e-9);
            prev = v;
            q += 0.05;
        }
    }

    #[test]
    fn empty_reservoir_uses_sentinels() {
        let snap = ReservoirSnapshot::from_unsorted(vec![]);
        assert_eq!(snap.count(), 0);
        assert_eq!(snap.min(), i64::MIN as f64);
        assert_eq!(snap.max(), i64::MAX as f64);
    }

    #[test]
    fn average_value_merge_matches_weighted_mean_formula() {
        let a = AverageValueSnapshot::new(10.0, 2);
        let b = AverageValueSnapshot::new(20.0, 3);
        let merged = AverageValueSnapshot::merge(a, b);
        assert_eq!(merged.value, (10.0 * 2.0 + 20.0 * 3.0) / 5.0);
        assert_eq!(merged.samples, 5);
    }

    #[test]
    fn average_value_merge_is_commutative_and_associative() {
        let a = AverageValueSnapshot::new(10.0, 2);
        let b = AverageValueSnapshot::new(20.0, 3);
        let c = AverageValueSnapshot::new(5.0, 7);

        let ab = AverageValueSnapshot::merge(a, b);
        let ba = AverageValueSnapshot::merge(b, a);
        assert_eq!(ab, ba);

        let ab_c = AverageValueSnapshot::merge(ab, c);
        let bc = AverageValueSnapshot::merge(b, c);
        let a_bc = AverageValueSnapshot::merge(a, bc);
        assert!((ab_c.value - a_bc.value).abs() < 1e-9);
        assert_eq!(ab_c.samples, a_bc.samples);
    }

    #[test]
    fn histogram_scenario_matches_spec_example() {
        // Updates {200, 10, 13, 10, 15, 30, 40, 45} into a capacity-5
        // ring: the last 5 survive, {10, 15, 30, 40, 45}.
        let snap = ReservoirSnapshot::from_unsorted(vec![10.0, 15.0, 30.0, 40.0, 45.0]);
        let histogram = HistogramSnapshot::new(snap, 8);
        assert_eq!(histogram.reservoir.min(), 10.0);
        assert_eq!(histogram.reservoir.max(), 45.0);
        assert!((histogram.reservoir.quantile(0.99) - 45.0).abs() < 1.0);
        assert!((histogram.reservoir.quantile(0.60) - 35.0).abs() < 2.0);
        assert_eq!(histogram.reservoir.mean(), (10.0 + 15.0 + 30.0 + 40.0 + 45.0) / 5.0);
        assert_eq!(histogram.count, 8);
    }

    #[test]
    fn histogram_merge_skips_values_covered_by_the_running_maximum() {
        // Naively interleaving [1,2,3] and [2,3,4] by "take the smaller"
        // reproduces the 2 twice (once from each side); the running
        // maximum must skip the repeat rather than re-emit it.
        let a = HistogramSnapshot::new(ReservoirSnapshot::from_unsorted(vec![1.0, 2.0, 3.0]), 3);
        let b = HistogramSnapshot::new(ReservoirSnapshot::from_unsorted(vec![2.0, 3.0, 4.0]), 3);
        let merged = HistogramSnapshot::merge(&a, &b);
        check!(merged.reservoir.values == vec![1.0, 2.0, 3.0]);
        check!(merged.count == 6);
    }

    #[test]
    fn histogram_merge_reaches_beyond_the_overlap_when_cap_allows() {
        // With a larger cap the interleave keeps advancing past the
        // duplicated run and surfaces the distinct tail value.
        let a = HistogramSnapshot::new(ReservoirSnapshot::from_unsorted(vec![1.0, 2.0, 3.0]), 4);
        let b = HistogramSnapshot::new(ReservoirSnapshot::from_unsorted(vec![2.0, 3.0, 4.0]), 3);
        let merged = HistogramSnapshot::merge(&a, &b);
        check!(merged.reservoir.values == vec![1.0, 2.0, 3.0, 4.0]);
        check!(merged.count == 7);
    }

    #[test]
    fn gauge_sum_aggregation_adds_values() {
        let a = GaugeSnapshot::new(3.0, GaugeAggregation::Sum);
        let b = GaugeSnapshot::new(4.0, GaugeAggregation::Sum);
        let merged = GaugeSnapshot::merge(&a, &b);
        assert_eq!(merged.value, 7.0);
        assert_eq!(merged.samples, 2);
    }

    #[test]
    fn gauge_average_aggregation_weights_by_samples() {
        let a = GaugeSnapshot::merge(
            &GaugeSnapshot::new(10.0, GaugeAggregation::Average),
            &GaugeSnapshot::new(10.0, GaugeAggregation::Average),
        );
        let b = GaugeSnapshot::new(20.0, GaugeAggregation::Average);
        let merged = GaugeSnapshot::merge(&a, &b);
        assert_eq!(merged.samples, 3);
        assert_eq!(merged.value, (10.0 * 2.0 + 20.0) / 3.0);
    }

    #[test]
    fn any_snapshot_merge_dispatches_per_variant() {
        let a = AnySnapshot::Cumulative(CumulativeValueSnapshot { total: 2.0 });
        let b = AnySnapshot::Cumulative(CumulativeValueSnapshot { total: 3.0 });
        match a.merge(&b) {
            AnySnapshot::Cumulative(c) => assert_eq!(c.total, 5.0),
            other => panic!("expected Cumulative, got {other:?}"),
        }
    }

    #[test]
    fn any_snapshot_kind_matches_publisher_vocabulary() {
        assert_eq!(AnySnapshot::Single(SingleValueSnapshot { value: 1.0 }).kind(), "ewma");
        assert_eq!(
            AnySnapshot::Cumulative(CumulativeValueSnapshot { total: 1.0 }).kind(),
            "counter"
        );
    }
}
