// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A trivial atomic counter.
//!
//! Grounded on `metrique-core::atomics::Counter`: a bare `AtomicI64` with
//! `increment`/`add`/`get` methods, no `AddAssign`/`SubAssign` impls
//! (those would need `&mut self`, which a metric shared behind `Arc`
//! never has). Wired into the registry as the `"counter"` metric kind.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::registry::TaggedMetric;
use crate::snapshot::{AnySnapshot, CumulativeValueSnapshot};

/// A signed 64-bit counter. It can be decremented via a negative
/// [`Counter::incr`], but publishers treat its snapshot as a lifetime
/// cumulative value.
#[derive(Debug, Default)]
pub struct Counter(AtomicI64);

impl Counter {
    /// A new counter starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self(AtomicI64::new(initial))
    }

    /// Add `n` to the counter (a negative `n` decrements it).
    pub fn incr(&self, n: i64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// The current value.
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl TaggedMetric for Counter {
    const TYPE_NAME: &'static str = "counter";

    fn snapshot(&self) -> AnySnapshot {
        AnySnapshot::Cumulative(CumulativeValueSnapshot {
            total: self.get() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sixteen_threads_hundred_increments_each_totals_1600() {
        let counter = Arc::new(Counter::new(0));
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..100 {
                        counter.incr(1);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.get(), 1600);
    }

    #[test]
    fn decrement_via_negative_incr() {
        let counter = Counter::new(10);
        counter.incr(-3);
        assert_eq!(counter.get(), 7);
    }

    #[test]
    fn snapshot_reports_lifetime_total() {
        let counter = Counter::new(0);
        counter.incr(5);
        match counter.snapshot() {
            AnySnapshot::Cumulative(snap) => assert_eq!(snap.total, 5.0),
            other => panic!("expected Cumulative, got {other:?}"),
        }
    }
}
