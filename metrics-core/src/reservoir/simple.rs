// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A reservoir backed directly by the fixed-capacity ring buffer: no
//! sampling, just "the last K values."

use crate::ring::RingBuffer;
use crate::snapshot::ReservoirSnapshot;

use super::Reservoir;

/// A reservoir that always retains exactly the last `K` updates.
pub struct SimpleReservoir {
    ring: RingBuffer<f64>,
}

impl SimpleReservoir {
    /// Construct a reservoir retaining the last `capacity` values.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
        }
    }
}

impl Reservoir for SimpleReservoir {
    fn update(&self, value: f64) {
        self.ring.push(value);
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        ReservoirSnapshot::from_unsorted(self.ring.iterate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_two_retains_last_two_values() {
        let reservoir = SimpleReservoir::new(2);
        reservoir.update(1.0);
        reservoir.update(2.0);
        reservoir.update(3.0);
        let snap = reservoir.snapshot();
        assert_eq!(snap.min(), 2.0);
        assert_eq!(snap.max(), 3.0);
        assert_eq!(snap.count(), 2);
    }
}
