// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The publish-options menu (distilled spec §4.L): how much of a
//! metric's snapshot a backend writer should emit, and how to scale it.
//!
//! Each struct implements `Default` so [`metrics_core::Registry::publish_options`]
//! can fall back to it when neither a per-path override nor a
//! repository-wide value has been set.

/// Shared by every publish-option kind: an optional multiplicative
/// scale applied before a value is written out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValuePublishOptions {
    /// Multiply the published value by this factor, if set.
    pub scale: Option<f64>,
}

impl ValuePublishOptions {
    /// Apply this option's scale to `value`, if any.
    pub fn apply(&self, value: f64) -> f64 {
        match self.scale {
            Some(factor) => value * factor,
            None => value,
        }
    }
}

/// Meter publish options: [`ValuePublishOptions`] plus whether to emit
/// the lifetime mean alongside the per-window rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterPublishOptions {
    /// Scale applied to both the mean and every window's rate.
    pub value: ValuePublishOptions,
    /// Whether to emit a `window="mean"` line.
    pub include_mean: bool,
}

impl Default for MeterPublishOptions {
    fn default() -> Self {
        Self {
            value: ValuePublishOptions::default(),
            include_mean: true,
        }
    }
}

/// The default quantiles a histogram publishes if not configured
/// otherwise: the 50th, 90th, and 99th percentiles.
pub const DEFAULT_QUANTILES: &[f64] = &[50.0, 90.0, 99.0];

/// Histogram publish options: [`ValuePublishOptions`] plus which
/// quantiles (as percentiles, `0..=100`) to emit and whether to emit the
/// lifetime update count.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPublishOptions {
    /// Scale applied to every emitted quantile value.
    pub value: ValuePublishOptions,
    /// Percentiles to publish, e.g. `50.0` for the median.
    ///
    /// Distilled spec §7 calls an out-of-range quantile a compile-time
    /// failure; a `Vec<f64>` built at runtime can't be checked at
    /// compile time, so this constructor asserts instead — the nearest
    /// runtime equivalent, and the same tradeoff already made for
    /// `Meter::rate`'s window set (see DESIGN.md).
    pub quantiles: Vec<f64>,
    /// Whether to emit a `METRIC_count{...}` line.
    pub include_count: bool,
}

impl HistogramPublishOptions {
    /// Construct options with an explicit quantile list.
    ///
    /// # Panics
    /// If any quantile falls outside `[0, 100]`.
    pub fn new(quantiles: Vec<f64>, include_count: bool) -> Self {
        for &q in &quantiles {
            assert!(
                (0.0..=100.0).contains(&q),
                "quantile {q} out of range [0, 100]"
            );
        }
        Self {
            value: ValuePublishOptions::default(),
            quantiles,
            include_count,
        }
    }
}

impl Default for HistogramPublishOptions {
    fn default() -> Self {
        Self {
            value: ValuePublishOptions::default(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
            include_count: true,
        }
    }
}

/// Timer publish options: [`HistogramPublishOptions`] (the duration
/// histogram) plus [`MeterPublishOptions`] (the call-rate meter) plus
/// whether the rate block is emitted at all.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerPublishOptions {
    /// Options for the duration-histogram block.
    pub histogram: HistogramPublishOptions,
    /// Options for the call-rate meter block.
    pub meter: MeterPublishOptions,
    /// Whether to emit the rate block at all.
    pub include_rates: bool,
}

impl Default for TimerPublishOptions {
    fn default() -> Self {
        Self {
            histogram: HistogramPublishOptions::default(),
            meter: MeterPublishOptions::default(),
            include_rates: true,
        }
    }
}
