// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Registry error types.
//!
//! Grounded on `cxxmetrics::metric_type_mismatch` (`metrics_registry.hpp`)
//! and styled after `metrique-writer-core::validate::ValidationError` —
//! a hand-written `Display`/`Error` impl, no `thiserror` dependency.

use std::fmt;

/// Raised when a path is re-registered under a metric kind that differs
/// from the one already registered there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTypeMismatch {
    existing: &'static str,
    desired: &'static str,
}

impl MetricTypeMismatch {
    /// Construct a mismatch error. `existing` and `desired` are the
    /// short type-name strings (`"counter"`, `"ewma"`, ...) the registry
    /// and publisher facade both use.
    pub fn new(existing: &'static str, desired: &'static str) -> Self {
        Self { existing, desired }
    }

    /// The type name already registered at the path.
    pub fn existing_type(&self) -> &'static str {
        self.existing
    }

    /// The type name that was requested and didn't match.
    pub fn desired_type(&self) -> &'static str {
        self.desired
    }
}

impl fmt::Display for MetricTypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "metric already registered as `{}`, cannot re-register as `{}`",
            self.existing, self.desired
        )
    }
}

impl std::error::Error for MetricTypeMismatch {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_both_type_names() {
        let err = MetricTypeMismatch::new("counter", "ewma");
        assert_eq!(err.existing_type(), "counter");
        assert_eq!(err.desired_type(), "ewma");
        let message = err.to_string();
        assert!(message.contains("counter"));
        assert!(message.contains("ewma"));
    }
}
