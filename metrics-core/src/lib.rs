// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod atomic_stack;
pub mod counter;
pub mod error;
pub mod ewma;
pub mod gauge;
pub mod histogram;
pub mod meter;
pub mod metric_path;
pub mod period;
pub mod registry;
pub mod reservoir;
pub mod ring;
pub mod snapshot;
pub mod tag_set;
pub mod timer;
pub mod value;

pub use counter::Counter;
pub use error::MetricTypeMismatch;
pub use ewma::Ewma;
pub use gauge::{AtomicGauge, Gauge, GaugeSource, OwnedGauge};
pub use histogram::Histogram;
pub use meter::Meter;
pub use metric_path::MetricPath;
pub use period::Period;
pub use registry::{AnyRegisteredMetric, Registry, TaggedMetric};
pub use reservoir::{Reservoir, SimpleReservoir, SlidingWindowReservoir, UniformReservoir};
pub use snapshot::{
    AnySnapshot, AverageValueSnapshot, CumulativeValueSnapshot, GaugeAggregation, GaugeSnapshot,
    HistogramSnapshot, MeterSnapshot, ReservoirSnapshot, SingleValueSnapshot, TimerSnapshot,
};
pub use tag_set::TagSet;
pub use timer::Timer;
pub use value::MetricValue;

// Re-exported the way `metrique` re-exports `metrique_timesource`: callers
// construct registries generic over `Clock` without a direct dependency
// on `metrics-core-timesource`.
pub use metrics_core_timesource::{Clock, Instant, SystemClock};

#[cfg(feature = "test-util")]
pub use metrics_core_timesource::fakes;
