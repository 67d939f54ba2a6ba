// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The publisher facade (distilled spec §4.L): traverses a
//! [`Registry`], resolves effective publish options, and hands each
//! metric's snapshot to a backend writer.
//!
//! Grounded on `metrique-writer-core`'s `Value`/`ValueWriter`/
//! `format::Format` split — the data model (this crate, via
//! `metrics-core`) is oblivious to how a backend encodes it, and a
//! concrete encoding lives in its own crate. No concrete encoding ships
//! here, matching the distilled spec's explicit scope boundary
//! ("only its interface contract is specified").

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Mutex;

use metrics_core::{AnySnapshot, MetricPath, Registry, TagSet};

use crate::options::{HistogramPublishOptions, MeterPublishOptions, TimerPublishOptions, ValuePublishOptions};

/// A marker type identifying one of the five snapshot variants a
/// [`BackendWriter`] can be specialized over, pairing it with the
/// publish-option type the facade should resolve for it.
///
/// `cxxmetrics/publisher.hpp` dispatches to one handler per metric kind
/// via a switch over a runtime type tag; this models the same
/// specialization at the type level, the way `metrique-writer-core`
/// specializes `ValueWriter` methods per [`Value`] kind.
pub trait SnapshotKind: Send + Sync + 'static {
    /// The snapshot payload a writer for this kind receives.
    type Snapshot: Clone;
    /// The publish-option type this kind resolves via
    /// [`Publisher::effective_options`].
    type Options: Clone + Default + Send + Sync + 'static;
}

/// Marker for a counter's cumulative-value snapshot.
pub struct CounterKind;
/// Marker for a gauge's current-value snapshot.
pub struct GaugeKind;
/// Marker for a histogram's reservoir+count snapshot.
pub struct HistogramKind;
/// Marker for a meter's mean+per-window-rate snapshot.
pub struct MeterKind;
/// Marker for a timer's histogram+meter snapshot.
pub struct TimerKind;

impl SnapshotKind for CounterKind {
    type Snapshot = metrics_core::CumulativeValueSnapshot;
    type Options = ValuePublishOptions;
}

impl SnapshotKind for GaugeKind {
    type Snapshot = metrics_core::GaugeSnapshot;
    type Options = ValuePublishOptions;
}

impl SnapshotKind for HistogramKind {
    type Snapshot = metrics_core::HistogramSnapshot;
    type Options = HistogramPublishOptions;
}

impl SnapshotKind for MeterKind {
    type Snapshot = metrics_core::MeterSnapshot;
    type Options = MeterPublishOptions;
}

impl SnapshotKind for TimerKind {
    type Snapshot = metrics_core::TimerSnapshot;
    type Options = TimerPublishOptions;
}

/// A concrete textual (or other) encoder for one [`SnapshotKind`].
///
/// A writer receives the destination, the metric's path, the tag set
/// for this particular tagged permutation, the snapshot itself, the
/// effective publish options, and a `header_emitted` flag it owns for
/// the duration of one path's publish pass: the facade resets it to
/// `false` before visiting a path's first tagged permutation, and the
/// writer sets it to `true` once it has emitted whatever one-time
/// header its format needs (e.g. a `# HELP`/`# TYPE` pair), so later
/// permutations of the same path in the same pass don't repeat it.
pub trait BackendWriter<S: SnapshotKind> {
    /// The destination type values are written into (an `io::Write`, a
    /// `String`, an in-memory buffer for tests, ...).
    type Output;

    /// Emit `(tags, snapshot)` for `path` to `output`.
    fn write(
        &mut self,
        output: &mut Self::Output,
        path: &MetricPath,
        tags: &TagSet,
        snapshot: &S::Snapshot,
        options: &S::Options,
        header_emitted: &mut bool,
    );
}

#[derive(Default)]
struct KeyedState {
    global: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    per_path: Mutex<HashMap<MetricPath, HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

/// Publisher-local state, attached either globally or per-path, under a
/// caller-chosen key type `K` (distilled spec §4.L: "Publisher-local
/// state attached per-metric or globally under a user-chosen tag
/// type"). Typical uses: a rate limiter's last-emit timestamp, a
/// dedup set of already-seen dimension combinations.
#[derive(Default)]
pub struct PublisherState(KeyedState);

impl PublisherState {
    /// Fetch or initialize the global state of type `K`.
    pub fn global<K: Clone + Send + Sync + Default + 'static>(&self) -> K {
        let mut table = self.0.global.lock().unwrap();
        table
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(K::default()))
            .downcast_ref::<K>()
            .expect("TypeId-keyed entry downcasts to the type it was keyed under")
            .clone()
    }

    /// Overwrite the global state of type `K`.
    pub fn set_global<K: Send + Sync + 'static>(&self, value: K) {
        self.0.global.lock().unwrap().insert(TypeId::of::<K>(), Box::new(value));
    }

    /// Fetch or initialize `path`'s state of type `K`.
    pub fn for_path<K: Clone + Send + Sync + Default + 'static>(&self, path: &MetricPath) -> K {
        let mut per_path = self.0.per_path.lock().unwrap();
        per_path
            .entry(path.clone())
            .or_default()
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(K::default()))
            .downcast_ref::<K>()
            .expect("TypeId-keyed entry downcasts to the type it was keyed under")
            .clone()
    }

    /// Overwrite `path`'s state of type `K`.
    pub fn set_for_path<K: Send + Sync + 'static>(&self, path: &MetricPath, value: K) {
        self.0
            .per_path
            .lock()
            .unwrap()
            .entry(path.clone())
            .or_default()
            .insert(TypeId::of::<K>(), Box::new(value));
    }
}

/// Walks a [`Registry`], resolving effective publish options and
/// handing each metric's snapshot to a [`BackendWriter`].
///
/// The publisher borrows the registry non-owningly (distilled spec §9's
/// design note on the cyclic/back-reference concern: "the publisher
/// borrows the registry non-owningly" — metrics never carry a
/// back-pointer to either the registry or a publisher).
pub struct Publisher<'r> {
    registry: &'r Registry,
    state: PublisherState,
}

impl<'r> Publisher<'r> {
    /// Construct a publisher over `registry`.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            state: PublisherState::default(),
        }
    }

    /// This publisher's local state store.
    pub fn state(&self) -> &PublisherState {
        &self.state
    }

    /// Resolve the effective options of kind `S` for `path`: a per-path
    /// override if one was set, else the repository-wide value, else
    /// `S::Options::default()`.
    pub fn effective_options<S: SnapshotKind>(&self, path: &MetricPath) -> S::Options {
        self.registry.publish_options::<S::Options>(path)
    }

    /// Visit one specific path's every tagged snapshot, silently doing
    /// nothing if no metric is registered there.
    pub fn visit_path(&self, path: &MetricPath, mut visit: impl FnMut(&TagSet, AnySnapshot)) {
        self.registry.visit_registered_metrics(|p, metric| {
            if p == path {
                metric.visit_each(&mut visit);
            }
        });
    }

    /// Walk every registered path, emitting each one's tagged snapshots
    /// through `dispatch`. `dispatch` is expected to match on
    /// `AnySnapshot`'s variant and call the appropriate
    /// `BackendWriter::write`, resetting its own `header_emitted` flag
    /// to `false` at the start of each path (the facade itself doesn't
    /// know which backend-writer-kind combination the caller is using,
    /// so it can't own that flag on the caller's behalf).
    pub fn publish_all(&self, mut dispatch: impl FnMut(&MetricPath, &TagSet, AnySnapshot)) {
        self.registry.visit_registered_metrics(|path, metric| {
            metric.visit_each(|tags, snapshot| dispatch(path, tags, snapshot));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use metrics_core::TagSet;

    struct TestCounterWriter;

    impl BackendWriter<CounterKind> for TestCounterWriter {
        type Output = Vec<String>;

        fn write(
            &mut self,
            output: &mut Self::Output,
            path: &MetricPath,
            tags: &TagSet,
            snapshot: &metrics_core::CumulativeValueSnapshot,
            options: &ValuePublishOptions,
            header_emitted: &mut bool,
        ) {
            if !*header_emitted {
                output.push(format!("# TYPE {} counter", path.display("_")));
                *header_emitted = true;
            }
            let value = options.apply(snapshot.total);
            output.push(format!(
                "{}{{tags={}}} {value}",
                path.display("_"),
                tags.len()
            ));
        }
    }

    #[test]
    fn effective_options_fall_back_through_the_resolution_chain() {
        let registry = Registry::new();
        let publisher = Publisher::new(&registry);
        let path: MetricPath = "requests".into();

        assert_eq!(
            publisher.effective_options::<CounterKind>(&path),
            ValuePublishOptions::default()
        );

        registry.set_publish_options(ValuePublishOptions { scale: Some(3.0) });
        assert_eq!(
            publisher.effective_options::<CounterKind>(&path).scale,
            Some(3.0)
        );
    }

    #[test]
    fn visit_path_on_an_unregistered_path_does_nothing() {
        let registry = Registry::new();
        let publisher = Publisher::new(&registry);
        let mut visited = false;
        publisher.visit_path(&"never-registered".into(), |_, _| visited = true);
        assert!(!visited);
    }

    #[test]
    fn publish_all_emits_one_header_per_path() {
        let registry = Registry::new();
        registry
            .counter("requests", 0, TagSet::single("route", "a"))
            .unwrap()
            .incr(1);
        registry
            .counter("requests", 0, TagSet::single("route", "b"))
            .unwrap()
            .incr(2);

        let publisher = Publisher::new(&registry);
        let mut writer = TestCounterWriter;
        let mut output = Vec::new();
        let options = publisher.effective_options::<CounterKind>(&"requests".into());

        let mut header_emitted = false;
        publisher.publish_all(|path, tags, snapshot| {
            if let AnySnapshot::Cumulative(c) = snapshot {
                writer.write(&mut output, path, tags, &c, &options, &mut header_emitted);
            }
        });

        check!(output.len() == 3);
        check!(output[0] == format!("# TYPE {} counter", "requests"));
    }

    #[test]
    fn publisher_state_round_trips_global_and_per_path() {
        let registry = Registry::new();
        let publisher = Publisher::new(&registry);

        assert_eq!(publisher.state().global::<u32>(), 0);
        publisher.state().set_global(7u32);
        assert_eq!(publisher.state().global::<u32>(), 7);

        let path: MetricPath = "requests".into();
        assert_eq!(publisher.state().for_path::<u32>(&path), 0);
        publisher.state().set_for_path(&path, 42u32);
        assert_eq!(publisher.state().for_path::<u32>(&path), 42);
    }
}
