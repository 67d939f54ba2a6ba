// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Compile-time-constructible duration values used to parameterize EWMAs,
//! meters, and timers.
//!
//! A [`Period`] is a `u64` count of microseconds. The constructors
//! (`Period::micros`, `::millis`, `::secs`, `::minutes`, `::hours`) are
//! `const fn`, so they can be used directly as the window/interval
//! arguments of a `const` metric configuration, mirroring `cxxmetrics`'s
//! `time::seconds(n)` free functions.

use std::time::Duration;

/// A duration, represented as a `u64` count of microseconds.
///
/// Periods are totally ordered and sort/dedup the way any other `u64`
/// would; this is what lets a window list built in any order collapse
/// to the same canonical, sorted form (see [`sort_dedup`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(u64);

impl Period {
    /// Construct a period of exactly `micros` microseconds.
    pub const fn micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Construct a period of `millis` milliseconds.
    pub const fn millis(millis: u64) -> Self {
        Self(millis * 1_000)
    }

    /// Construct a period of `secs` seconds.
    pub const fn secs(secs: u64) -> Self {
        Self(secs * 1_000_000)
    }

    /// Construct a period of `mins` minutes.
    pub const fn minutes(mins: u64) -> Self {
        Self(mins * 60 * 1_000_000)
    }

    /// Construct a period of `hrs` hours.
    pub const fn hours(hrs: u64) -> Self {
        Self(hrs * 60 * 60 * 1_000_000)
    }

    /// The number of whole microseconds in this period.
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// This period as a [`Duration`].
    pub const fn as_duration(&self) -> Duration {
        Duration::from_micros(self.0)
    }

    /// Number of times `self` divides whole into `other`, floored.
    ///
    /// Used by the EWMA tick algorithm to count elapsed/missed intervals.
    pub const fn whole_units_in(&self, other: Duration) -> u64 {
        (other.as_micros() as u64) / self.0
    }
}

impl From<Duration> for Period {
    fn from(d: Duration) -> Self {
        Self(d.as_micros() as u64)
    }
}

impl From<Period> for Duration {
    fn from(p: Period) -> Self {
        p.as_duration()
    }
}

/// Sort and deduplicate a window list.
///
/// Two meters configured with the same set of windows in different
/// orders must be treated as the same logical configuration (per the
/// registry's type-checking contract); this canonicalizes a window list
/// so that configuration equality can be checked (and a stable type-name
/// key derived) regardless of the order the caller listed them in.
pub fn sort_dedup(mut windows: Vec<Period>) -> Vec<Period> {
    windows.sort_unstable();
    windows.dedup();
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn constructors_agree_on_microseconds() {
        assert_eq!(Period::secs(1).as_micros(), 1_000_000);
        assert_eq!(Period::millis(1_500).as_micros(), 1_500_000);
        assert_eq!(Period::minutes(1).as_micros(), 60_000_000);
        assert_eq!(Period::hours(1).as_micros(), 3_600_000_000);
    }

    #[rstest]
    #[case(Period::micros(1), 1)]
    #[case(Period::millis(1), 1_000)]
    #[case(Period::secs(1), 1_000_000)]
    #[case(Period::minutes(1), 60_000_000)]
    #[case(Period::hours(1), 3_600_000_000)]
    fn each_unit_converts_to_the_expected_microsecond_count(#[case] period: Period, #[case] expected_micros: u64) {
        assert_eq!(period.as_micros(), expected_micros);
    }

    #[test]
    fn sort_dedup_canonicalizes_order_and_duplicates() {
        let a = sort_dedup(vec![Period::minutes(5), Period::minutes(1), Period::minutes(1)]);
        let b = sort_dedup(vec![Period::minutes(1), Period::minutes(5)]);
        assert_eq!(a, b);
        assert_eq!(a, vec![Period::minutes(1), Period::minutes(5)]);
    }

    #[test]
    fn whole_units_in_floors() {
        let interval = Period::secs(1);
        assert_eq!(interval.whole_units_in(Duration::from_millis(2_500)), 2);
    }
}
