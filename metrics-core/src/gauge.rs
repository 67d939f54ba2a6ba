// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A gauge: publishes whatever a pluggable [`GaugeSource`] currently
//! reads back.
//!
//! Grounded on `cxxmetrics::gauge` (`gauge.hpp`), which the distilled
//! spec's §4.K describes as three provider shapes: an owned value, a
//! pointer/reference, or a zero-argument callable. We model all three as
//! one trait, [`GaugeSource`], so [`Gauge`] stays generic over a single
//! type parameter instead of needing three separate registry
//! constructors: [`OwnedGauge`] covers "owned value", [`AtomicGauge`]
//! covers "pointer/reference" (the gauge reads through it on every
//! snapshot rather than copying), and the blanket impl for
//! `Fn() -> f64` covers "callable".

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::registry::TaggedMetric;
use crate::snapshot::{AnySnapshot, GaugeAggregation, GaugeSnapshot};

/// Something a [`Gauge`] can read a current value from.
pub trait GaugeSource: Send + Sync {
    /// Read the current value.
    fn read(&self) -> f64;
}

impl<F: Fn() -> f64 + Send + Sync> GaugeSource for F {
    fn read(&self) -> f64 {
        self()
    }
}

/// An owned `f64` the caller updates with [`OwnedGauge::set`]; the
/// snapshot is whatever was last set.
#[derive(Debug, Default)]
pub struct OwnedGauge(Mutex<f64>);

impl OwnedGauge {
    /// An owned gauge starting at `initial`.
    pub fn new(initial: f64) -> Self {
        Self(Mutex::new(initial))
    }

    /// Overwrite the current value.
    pub fn set(&self, value: f64) {
        *self.0.lock().unwrap() = value;
    }
}

impl GaugeSource for OwnedGauge {
    fn read(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

/// A gauge backed by a caller-owned `AtomicI64` the gauge dereferences
/// on every snapshot, rather than owning a copy of the value.
#[derive(Debug, Default)]
pub struct AtomicGauge(AtomicI64);

impl AtomicGauge {
    /// An atomic gauge starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self(AtomicI64::new(initial))
    }

    /// Overwrite the current value.
    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }
}

impl GaugeSource for AtomicGauge {
    fn read(&self) -> f64 {
        self.0.load(Ordering::Relaxed) as f64
    }
}

/// A gauge over a pluggable [`GaugeSource`], with a merge law
/// ([`GaugeAggregation`]) for combining multiple tagged permutations in
/// a registry's `aggregate()`.
pub struct Gauge<S: GaugeSource> {
    source: S,
    aggregation: GaugeAggregation,
}

impl<S: GaugeSource> Gauge<S> {
    /// Wrap `source`, merging tagged permutations per `aggregation`.
    pub fn new(source: S, aggregation: GaugeAggregation) -> Self {
        Self { source, aggregation }
    }

    /// The current value.
    pub fn get(&self) -> f64 {
        self.source.read()
    }
}

impl<S: GaugeSource + 'static> TaggedMetric for Gauge<S> {
    const TYPE_NAME: &'static str = "gauge";

    fn snapshot(&self) -> AnySnapshot {
        AnySnapshot::Gauge(GaugeSnapshot::new(self.get(), self.aggregation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_gauge_reports_last_set_value() {
        let gauge = Gauge::new(OwnedGauge::new(1.0), GaugeAggregation::Average);
        assert_eq!(gauge.get(), 1.0);
        gauge.source.set(2.5);
        assert_eq!(gauge.get(), 2.5);
    }

    #[test]
    fn callable_gauge_reads_through_the_closure() {
        let gauge = Gauge::new(|| 42.0, GaugeAggregation::Sum);
        assert_eq!(gauge.get(), 42.0);
    }

    #[test]
    fn atomic_gauge_reflects_external_updates() {
        let source = AtomicGauge::new(5);
        let gauge = Gauge::new(source, GaugeAggregation::Sum);
        assert_eq!(gauge.get(), 5.0);
        gauge.source.set(9);
        assert_eq!(gauge.get(), 9.0);
    }
}
