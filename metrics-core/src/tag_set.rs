// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! [`TagSet`], an order-independent mapping from tag key to
//! [`MetricValue`].
//!
//! Grounded on `cxxmetrics::tag_collection` (`tag_collection.hpp`).
//! Equality is order-independent, inherited directly from `HashMap`'s
//! own `PartialEq`. The hash combiner is an XOR-accumulation over each
//! entry's own hash, which is genuinely order-independent — unlike the
//! original's `result = (result * 397) ^ (h(key) ^ h(value))` running
//! combiner, which actually depends on iteration order despite the
//! type's documented order-independent equality (see DESIGN.md).

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;

use crate::value::MetricValue;

/// A fixed seed so the per-entry hash used to build [`TagSet`]'s overall
/// [`Hash`] is the same across instances — unlike the `HashMap`'s own
/// (randomized) `RandomState`, which only needs in-process bucket
/// distribution, not a reproducible combiner.
const TAG_HASH_SEEDS: (u64, u64, u64, u64) = (0, 0, 0, 0);

/// An order-independent set of tag key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct TagSet(HashMap<String, MetricValue, RandomState>);

impl TagSet {
    /// An empty tag set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a tag set from an iterator of key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<MetricValue>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A single-entry tag set.
    pub fn single(key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self::from_pairs([(key.into(), value.into())])
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this tag set has no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.0.get(key)
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(k, v)| other.0.get(k).is_some_and(|ov| v == ov))
    }
}

impl Eq for TagSet {}

impl Hash for TagSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (k0, k1, k2, k3) = TAG_HASH_SEEDS;
        let builder = RandomState::with_seeds(k0, k1, k2, k3);
        let combined = self.0.iter().fold(0u64, |acc, (k, v)| {
            let mut hasher = builder.build_hasher();
            k.hash(&mut hasher);
            v.hash(&mut hasher);
            acc ^ hasher.finish()
        });
        combined.hash(state);
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for TagSet
where
    K: Into<String>,
    V: Into<MetricValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_pairs(pairs)
    }
}
