// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Classical reservoir sampling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::snapshot::ReservoirSnapshot;

use super::Reservoir;

/// A reservoir-sampled buffer of capacity `K`.
///
/// The first `K` updates fill positions `0..K`; the `n`-th update
/// (`n >= K`) draws a uniform index in `[0, n)` and replaces the
/// resident value at that index only if the index falls inside `[0, K)`
/// — so later updates are progressively less likely to displace an
/// earlier sample, giving every observed value an equal `K/n` chance of
/// residing in the final reservoir.
pub struct UniformReservoir {
    capacity: usize,
    values: Mutex<Vec<f64>>,
    count: AtomicU64,
    rng: Mutex<ChaCha8Rng>,
}

impl UniformReservoir {
    /// Construct a reservoir of the given capacity, seeding its RNG from
    /// a high-resolution clock read folded into a non-zero 32-bit seed.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "reservoir capacity must be positive");
        let folded = fold_seed(std::time::Instant::now());
        Self {
            capacity,
            values: Mutex::new(Vec::with_capacity(capacity)),
            count: AtomicU64::new(0),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(folded as u64)),
        }
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Fold a clock reading down to a non-zero 32-bit seed.
fn fold_seed(now: std::time::Instant) -> u32 {
    let nanos = now.elapsed().as_nanos() as u64 ^ (now.elapsed().as_nanos() >> 32) as u64;
    let folded = (nanos ^ (nanos >> 32)) as u32;
    if folded == 0 {
        1
    } else {
        folded
    }
}

impl Reservoir for UniformReservoir {
    fn update(&self, value: f64) {
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        let mut values = self.values.lock().unwrap();
        if (n as usize) < self.capacity {
            values.push(value);
            return;
        }
        let index = {
            let mut rng = self.rng.lock().unwrap();
            rng.random_range(0..=(n as usize))
        };
        if index < self.capacity {
            values[index] = value;
        }
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        let values = self.values.lock().unwrap();
        ReservoirSnapshot::from_unsorted(values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_up_to_capacity_without_replacement() {
        let reservoir = UniformReservoir::new(3);
        reservoir.update(1.0);
        reservoir.update(2.0);
        reservoir.update(3.0);
        let snap = reservoir.snapshot();
        assert_eq!(snap.count(), 3);
        assert_eq!(snap.min(), 1.0);
        assert_eq!(snap.max(), 3.0);
    }

    #[test]
    fn never_exceeds_capacity_after_many_updates() {
        let reservoir = UniformReservoir::new(5);
        for i in 0..1000 {
            reservoir.update(i as f64);
        }
        assert_eq!(reservoir.snapshot().count(), 5);
    }

    #[test]
    fn empty_reservoir_reports_sentinel_snapshot() {
        let reservoir = UniformReservoir::new(4);
        let snap = reservoir.snapshot();
        assert_eq!(snap.count(), 0);
        assert_eq!(snap.min(), i64::MIN as f64);
        assert_eq!(snap.max(), i64::MAX as f64);
    }
}
