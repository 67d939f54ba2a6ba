// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod facade;
pub mod options;
pub mod sanitize;

pub use facade::{
    BackendWriter, CounterKind, GaugeKind, HistogramKind, MeterKind, Publisher, PublisherState,
    SnapshotKind, TimerKind,
};
pub use options::{
    HistogramPublishOptions, MeterPublishOptions, TimerPublishOptions, ValuePublishOptions,
    DEFAULT_QUANTILES,
};
pub use sanitize::{escape_tag_value, sanitize_identifier, short_type_name};
