// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The tagged path store ([`RegisteredMetric`]) and the [`Registry`] that
//! sits on top of it.
//!
//! Grounded on `cxxmetrics::metrics_registry` (`metrics_registry.hpp`):
//! a path maps to exactly one registered metric *kind*; a tag-set within
//! that path maps to exactly one live instance, built lazily on first
//! access and shared with every later caller asking for the same tags.
//! Registering a second, differently-shaped metric at an existing path
//! is an error rather than silently shadowing the first (§7's *type
//! mismatch*).
//!
//! Type erasure here is a hand-rolled vtable (`type_name`/`visit_each`/
//! `aggregate_all` function pointers captured per concrete `T` at
//! registration time) rather than a trait object, because the path map
//! needs to hold `Arc<dyn Any + Send + Sync>` for `Arc::downcast` to
//! work when a caller revisits an existing path — a plain trait object
//! can't be downcast back to its concrete `Arc<T>` on stable without
//! that `Any` bound.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::MetricTypeMismatch;
use crate::metric_path::MetricPath;
use crate::snapshot::AnySnapshot;
use crate::tag_set::TagSet;

/// Implemented by every live metric kind the registry can store:
/// counters, EWMAs, gauges, histograms, meters, timers.
///
/// `TYPE_NAME` is the short, namespace-stripped identifier
/// (`"counter"`, `"ewma"`, ...) used both for the §7 type-mismatch error
/// message and as the publisher facade's type-inference vocabulary.
pub trait TaggedMetric: Send + Sync + 'static {
    /// The short type-name this metric kind registers itself under.
    const TYPE_NAME: &'static str;

    /// A point-in-time snapshot of this metric's current state.
    fn snapshot(&self) -> AnySnapshot;
}

/// A path's registered metric: maps each observed tag-set to its own
/// lazily-built, shared live instance.
///
/// First access for a `(path, tags)` pair consults the map and, on a
/// miss, invokes the caller-supplied builder; on a hit, the builder is
/// discarded and the existing instance is returned.
pub struct RegisteredMetric<T: TaggedMetric> {
    instances: Mutex<HashMap<TagSet, Arc<T>>>,
}

impl<T: TaggedMetric> RegisteredMetric<T> {
    fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the instance for `tags`, building it with `builder` on a
    /// first access. The builder is not invoked (and its work is
    /// discarded) if another thread already built one first.
    pub fn get_or_create(&self, tags: &TagSet, builder: impl FnOnce() -> T) -> Arc<T> {
        let mut instances = self.instances.lock().unwrap();
        if let Some(existing) = instances.get(tags) {
            return Arc::clone(existing);
        }
        let built = Arc::new(builder());
        instances.insert(tags.clone(), Arc::clone(&built));
        built
    }

    /// Attach an already-constructed instance at `tags`. Returns the
    /// instance that ends up stored (the caller's, if this was the
    /// first registration for these tags; the prior one otherwise) and
    /// whether `metric` was the one actually stored.
    pub fn register_existing(&self, tags: &TagSet, metric: Arc<T>) -> (Arc<T>, bool) {
        let mut instances = self.instances.lock().unwrap();
        if let Some(existing) = instances.get(tags) {
            return (Arc::clone(existing), false);
        }
        instances.insert(tags.clone(), Arc::clone(&metric));
        (metric, true)
    }
}

fn visit_each_impl<T: TaggedMetric>(
    metric: &Arc<dyn Any + Send + Sync>,
    visit: &mut dyn FnMut(&TagSet, AnySnapshot),
) {
    let registered = metric
        .downcast_ref::<RegisteredMetric<T>>()
        .expect("path slot's concrete type is fixed at registration");
    let instances = registered.instances.lock().unwrap();
    for (tags, instance) in instances.iter() {
        visit(tags, instance.snapshot());
    }
}

fn aggregate_all_impl<T: TaggedMetric>(metric: &Arc<dyn Any + Send + Sync>) -> Option<AnySnapshot> {
    let registered = metric
        .downcast_ref::<RegisteredMetric<T>>()
        .expect("path slot's concrete type is fixed at registration");
    let instances = registered.instances.lock().unwrap();
    let mut values = instances.values();
    let mut acc = values.next()?.snapshot();
    for instance in values {
        acc = acc.merge(&instance.snapshot());
    }
    Some(acc)
}

struct PathSlot {
    type_name: &'static str,
    metric: Arc<dyn Any + Send + Sync>,
    visit_each: fn(&Arc<dyn Any + Send + Sync>, &mut dyn FnMut(&TagSet, AnySnapshot)),
    aggregate_all: fn(&Arc<dyn Any + Send + Sync>) -> Option<AnySnapshot>,
}

impl PathSlot {
    fn new<T: TaggedMetric>(registered: Arc<RegisteredMetric<T>>) -> Self {
        Self {
            type_name: T::TYPE_NAME,
            metric: registered,
            visit_each: visit_each_impl::<T>,
            aggregate_all: aggregate_all_impl::<T>,
        }
    }
}

/// A read-only view of one path's registered metric, handed to a
/// [`Registry::visit_registered_metrics`] handler.
pub struct AnyRegisteredMetric<'a> {
    slot: &'a PathSlot,
}

impl AnyRegisteredMetric<'_> {
    /// The short type-name this path was registered under.
    pub fn type_name(&self) -> &'static str {
        self.slot.type_name
    }

    /// Visit every tagged instance's current snapshot.
    ///
    /// Takes the registered metric's own lock, not the registry's — per
    /// §5, the registry's path-map lock must never be re-entered from
    /// inside a `visit_registered_metrics` handler.
    pub fn visit_each(&self, mut visit: impl FnMut(&TagSet, AnySnapshot)) {
        (self.slot.visit_each)(&self.slot.metric, &mut visit);
    }

    /// Merge every tagged instance's snapshot into one, per that
    /// snapshot kind's merge law. `None` if no tagged instance has been
    /// created yet.
    pub fn aggregate_all(&self) -> Option<AnySnapshot> {
        (self.slot.aggregate_all)(&self.slot.metric)
    }
}

#[derive(Default)]
struct PublishOptionsTable(Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>);

impl PublishOptionsTable {
    fn set<O: Send + Sync + 'static>(&self, opts: O) {
        self.0.lock().unwrap().insert(TypeId::of::<O>(), Box::new(opts));
    }

    fn get<O: Clone + Send + Sync + 'static>(&self) -> Option<O> {
        self.0
            .lock()
            .unwrap()
            .get(&TypeId::of::<O>())
            .and_then(|boxed| boxed.downcast_ref::<O>())
            .cloned()
    }
}

/// Path → registered-metric store, plus repository-wide and per-path
/// publish-option tables.
///
/// Grounded on `cxxmetrics::metrics_registry`. Construction methods
/// (`counter`, `ewma`, `gauge`, `histogram`, `meter`, `timer`,
/// `register_existing`) are type-checked: registering a second metric at
/// an existing path under a different concrete type returns
/// [`MetricTypeMismatch`] rather than silently aliasing or shadowing.
///
/// Publish options are stored generically (keyed by the option struct's
/// `TypeId`, the way the design note on global mutable state asks for —
/// "an explicit per-registry owned record", not a process-wide static):
/// `metrics-core` never needs to know the concrete option shapes
/// `metrics-core-publish` defines.
#[derive(Default)]
pub struct Registry {
    paths: Mutex<HashMap<MetricPath, PathSlot>>,
    publish_options: PublishOptionsTable,
    path_publish_options: Mutex<HashMap<MetricPath, PublishOptionsTable>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot<T: TaggedMetric>(
        &self,
        path: MetricPath,
    ) -> Result<Arc<RegisteredMetric<T>>, MetricTypeMismatch> {
        let mut paths = self.paths.lock().unwrap();
        if let Some(existing) = paths.get(&path) {
            return existing
                .metric
                .clone()
                .downcast::<RegisteredMetric<T>>()
                .map_err(|_| MetricTypeMismatch::new(existing.type_name, T::TYPE_NAME));
        }
        let registered = Arc::new(RegisteredMetric::<T>::new());
        tracing::debug!(path = %path.display("/"), type_name = T::TYPE_NAME, "registering new metric path");
        paths.insert(path, PathSlot::new(Arc::clone(&registered)));
        Ok(registered)
    }

    /// Create or fetch the counter at `path` for `tags`, initializing a
    /// fresh instance to `initial` if this is the first access.
    pub fn counter(
        &self,
        path: impl Into<MetricPath>,
        initial: i64,
        tags: TagSet,
    ) -> Result<Arc<crate::counter::Counter>, MetricTypeMismatch> {
        let slot = self.slot::<crate::counter::Counter>(path.into())?;
        Ok(slot.get_or_create(&tags, || crate::counter::Counter::new(initial)))
    }

    /// Create or fetch the EWMA at `path` for `tags`, with the exact
    /// `(window, interval)` parameter pair.
    pub fn ewma<C: crate::Clock + Clone + 'static>(
        &self,
        path: impl Into<MetricPath>,
        window: crate::period::Period,
        interval: crate::period::Period,
        clock: C,
        tags: TagSet,
    ) -> Result<Arc<crate::ewma::Ewma<C>>, MetricTypeMismatch> {
        let slot = self.slot::<crate::ewma::Ewma<C>>(path.into())?;
        Ok(slot.get_or_create(&tags, || crate::ewma::Ewma::new(window, interval, clock)))
    }

    /// Create or fetch the gauge at `path` for `tags`, backed by
    /// `source` and merging tagged permutations per `aggregation`.
    pub fn gauge<S: crate::gauge::GaugeSource + 'static>(
        &self,
        path: impl Into<MetricPath>,
        source: S,
        aggregation: crate::snapshot::GaugeAggregation,
        tags: TagSet,
    ) -> Result<Arc<crate::gauge::Gauge<S>>, MetricTypeMismatch> {
        let slot = self.slot::<crate::gauge::Gauge<S>>(path.into())?;
        Ok(slot.get_or_create(&tags, || crate::gauge::Gauge::new(source, aggregation)))
    }

    /// Create or fetch the histogram at `path` for `tags`, over
    /// `reservoir` (moved in on first access).
    pub fn histogram<R: crate::reservoir::Reservoir + 'static>(
        &self,
        path: impl Into<MetricPath>,
        reservoir: R,
        tags: TagSet,
    ) -> Result<Arc<crate::histogram::Histogram<R>>, MetricTypeMismatch> {
        let slot = self.slot::<crate::histogram::Histogram<R>>(path.into())?;
        Ok(slot.get_or_create(&tags, || crate::histogram::Histogram::new(reservoir)))
    }

    /// Create or fetch the meter at `path` for `tags`, ticking at
    /// `interval` and tracking `windows` (sorted/deduplicated).
    pub fn meter<C: crate::Clock + Clone + 'static>(
        &self,
        path: impl Into<MetricPath>,
        interval: crate::period::Period,
        windows: Vec<crate::period::Period>,
        clock: C,
        tags: TagSet,
    ) -> Result<Arc<crate::meter::Meter<C>>, MetricTypeMismatch> {
        let slot = self.slot::<crate::meter::Meter<C>>(path.into())?;
        Ok(slot.get_or_create(&tags, || crate::meter::Meter::new(interval, windows, clock)))
    }

    /// Create or fetch the timer at `path` for `tags`, over `reservoir`
    /// and a call-rate meter ticking at `interval` across `windows`.
    pub fn timer<C: crate::Clock + Clone + 'static, R: crate::reservoir::Reservoir + 'static>(
        &self,
        path: impl Into<MetricPath>,
        reservoir: R,
        interval: crate::period::Period,
        windows: Vec<crate::period::Period>,
        clock: C,
        tags: TagSet,
    ) -> Result<Arc<crate::timer::Timer<C, R>>, MetricTypeMismatch> {
        let slot = self.slot::<crate::timer::Timer<C, R>>(path.into())?;
        Ok(slot.get_or_create(&tags, || crate::timer::Timer::new(reservoir, interval, windows, clock)))
    }

    /// Attach an already-constructed metric at `path` for `tags`.
    /// Returns `true` if `metric` was stored (this was the first
    /// registration for these tags), `false` if a prior instance
    /// already held the slot and `metric` was discarded.
    pub fn register_existing<T: TaggedMetric>(
        &self,
        path: impl Into<MetricPath>,
        metric: Arc<T>,
        tags: TagSet,
    ) -> Result<bool, MetricTypeMismatch> {
        let slot = self.slot::<T>(path.into())?;
        let (_, inserted) = slot.register_existing(&tags, metric);
        Ok(inserted)
    }

    /// Set repository-wide publish options of type `O`. Overridden by
    /// any per-path options of the same type set via
    /// [`Registry::set_path_publish_options`].
    pub fn set_publish_options<O: Send + Sync + 'static>(&self, opts: O) {
        self.publish_options.set(opts);
    }

    /// Override publish options of type `O` for one specific path.
    pub fn set_path_publish_options<O: Send + Sync + 'static>(
        &self,
        path: impl Into<MetricPath>,
        opts: O,
    ) {
        let mut table = self.path_publish_options.lock().unwrap();
        table.entry(path.into()).or_default().set(opts);
    }

    /// Resolve the effective publish options of type `O` for `path`:
    /// per-path override if present, else the repository-wide value,
    /// else `O::default()`.
    pub fn publish_options<O: Clone + Default + Send + Sync + 'static>(
        &self,
        path: &MetricPath,
    ) -> O {
        if let Some(table) = self.path_publish_options.lock().unwrap().get(path) {
            if let Some(opts) = table.get::<O>() {
                return opts;
            }
        }
        self.publish_options.get::<O>().unwrap_or_default()
    }

    /// Invoke `handler(path, registered)` for every registered path,
    /// under the registry's own path-map lock. The handler may call
    /// [`AnyRegisteredMetric::visit_each`] or
    /// [`AnyRegisteredMetric::aggregate_all`] (each taking the
    /// registered metric's own, separate lock) but must never call back
    /// into the registry itself.
    pub fn visit_registered_metrics(
        &self,
        mut handler: impl FnMut(&MetricPath, AnyRegisteredMetric<'_>),
    ) {
        let paths = self.paths.lock().unwrap();
        for (path, slot) in paths.iter() {
            handler(path, AnyRegisteredMetric { slot });
        }
    }
}
