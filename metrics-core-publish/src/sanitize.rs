// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Identifier sanitization and tag-value escaping shared by every
//! textual backend writer (distilled spec §6, "Backend writer
//! contract").

/// Sanitize a metric or tag identifier for emission in a textual format
/// that only allows `[A-Za-z0-9_]`: every other character becomes `_`,
/// and a leading digit gets an `_` prefix (identifiers in most textual
/// metric formats, Prometheus included, can't start with a digit).
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.push('_');
    }
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

/// Escape a tag value for embedding inside a quoted string: backslash
/// and double-quote are both backslash-escaped.
pub fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Strip a type-name string down to the short, namespace-free form the
/// publisher facade's vocabulary expects (`"counter"`, `"histogram"`,
/// ...).
///
/// `cxxmetrics`'s publisher has to do real work here: its type names
/// come from `typeid(T).name()`, which is namespace-qualified and
/// carries template argument brackets that need stripping. In this
/// crate every [`metrics_core::TaggedMetric::TYPE_NAME`] is already a
/// short literal (`"counter"`, `"ewma"`, ...), so this function is a
/// no-op for anything already in that vocabulary — it exists for
/// contract completeness and for callers who do construct a type-name
/// from `std::any::type_name::<T>()` and need the same stripping rule
/// applied.
pub fn short_type_name(raw: &str) -> &str {
    let without_generics = raw.split('<').next().unwrap_or(raw);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_alphanumeric_becomes_underscore() {
        assert_eq!(sanitize_identifier("service.requests-count"), "service_requests_count");
    }

    #[test]
    fn leading_digit_gets_prefixed() {
        assert_eq!(sanitize_identifier("5xx_count"), "_5xx_count");
    }

    #[test]
    fn already_clean_identifier_is_unchanged() {
        assert_eq!(sanitize_identifier("requests_total"), "requests_total");
    }

    #[test]
    fn tag_values_escape_quotes_and_backslashes() {
        assert_eq!(escape_tag_value(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_tag_value(r"a\b"), r"a\\b");
    }

    #[test]
    fn short_type_name_strips_namespace_and_generics() {
        assert_eq!(short_type_name("metrics_core::histogram::Histogram<R>"), "Histogram");
        assert_eq!(short_type_name("counter"), "counter");
    }
}
