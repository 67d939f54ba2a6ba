// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A fixed-capacity, lossy sampling ring buffer.
//!
//! `cxxmetrics`'s original `ringbuf` is a full MPMC queue with `shift`
//! semantics and a three-pointer (`head`/`ready`/`tail`) protocol. This
//! is a pure sampling structure instead: pushes never block, never fail,
//! and silently displace the oldest element once the buffer is full.
//! There is no `shift`/dequeue operation — a [`RingBuffer`] backs
//! reservoirs, never a work queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A fixed-capacity ring buffer that overwrites its oldest element once
/// full, tolerating concurrent writers.
///
/// Capacity must be at least 2. Reads ([`RingBuffer::iterate`]) are
/// snapshot-consistent with respect to a single `(tail, size)` pair
/// observed at iterator construction, but make no promise about
/// ordering relative to concurrent pushes beyond that — this is a
/// sampling structure, not a queue.
pub struct RingBuffer<T: Clone> {
    capacity: usize,
    slots: Box<[Mutex<Option<T>>]>,
    tail: AtomicUsize,
    size: AtomicUsize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a new ring buffer with room for `capacity` elements.
    ///
    /// # Panics
    /// If `capacity < 2`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring buffer capacity must be at least 2");
        let slots = (0..capacity).map(|_| Mutex::new(None)).collect();
        Self {
            capacity,
            slots,
            tail: AtomicUsize::new(0),
            size: AtomicUsize::new(0),
        }
    }

    /// The buffer's fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a value, displacing the oldest resident value if the buffer
    /// is already full.
    pub fn push(&self, value: T) {
        let slot = self.tail.fetch_add(1, Ordering::AcqRel) % self.capacity;
        *self.slots[slot].lock().unwrap() = Some(value);
        // Advance size up to capacity; once full it never grows further
        // (the buffer is always "full" from then on — new writes simply
        // overwrite the oldest slot, and size remains the capacity).
        let _ = self
            .size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |size| {
                if size < self.capacity {
                    Some(size + 1)
                } else {
                    None
                }
            });
    }

    /// The number of logically resident elements: `min(total pushes, capacity)`.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// `true` if no value has ever been pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect up to `capacity` resident elements in logical
    /// oldest-to-newest order, as of a `(tail, size)` pair observed at
    /// call time.
    ///
    /// Concurrent pushes during iteration may or may not be reflected;
    /// the snapshot is internally consistent (no torn reads of an
    /// individual slot) but not linearizable with respect to the whole
    /// buffer.
    pub fn iterate(&self) -> Vec<T> {
        let tail = self.tail.load(Ordering::Acquire);
        let size = self.size.load(Ordering::Acquire).min(self.capacity);
        let mut out = Vec::with_capacity(size);
        // The oldest resident element is `capacity` slots behind `tail`
        // (mod capacity) if the buffer is full; if not yet full, the
        // oldest is simply slot 0.
        let start = if size < self.capacity {
            0
        } else {
            tail % self.capacity
        };
        for i in 0..size {
            let slot = (start + i) % self.capacity;
            if let Some(value) = self.slots[slot].lock().unwrap().clone() {
                out.push(value);
            }
        }
        out
    }
}
