// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Naming helpers shared by the flattener, the metric constructor and the handlers.

/// Character used to join metric path segments.
pub const PATH_DELIMITER: char = '.';

/// Character substituted for anything outside the allowed segment alphabet.
pub const REPLACEMENT: char = '_';

/// Returns true if `ch` may appear inside a single metric path segment.
#[inline]
pub fn is_segment_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Returns true if `segment` is non-empty and uses only the allowed alphabet.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(is_segment_char)
}

/// Sanitizes one key into a path segment.
///
/// Every character outside `[A-Za-z0-9_-]` (the path delimiter included) is replaced with `_`.
/// An empty key has nothing to name and is rejected with `None`.
///
/// # Examples
///
/// ```
/// use metrics_core::util::sanitize_segment;
///
/// assert_eq!(sanitize_segment("opcounters"), Some("opcounters".to_string()));
/// assert_eq!(sanitize_segment("wired.tiger"), Some("wired_tiger".to_string()));
/// assert_eq!(sanitize_segment("page faults"), Some("page_faults".to_string()));
/// assert_eq!(sanitize_segment(""), None);
/// ```
pub fn sanitize_segment(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    Some(
        key.chars()
            .map(|ch| if is_segment_char(ch) { ch } else { REPLACEMENT })
            .collect(),
    )
}

/// Sanitizes a dotted prefix segment by segment, dropping empty segments.
///
/// ```
/// use metrics_core::util::sanitize_prefix;
///
/// assert_eq!(sanitize_prefix("servers.db host..mongo"), "servers.db_host.mongo");
/// assert_eq!(sanitize_prefix(""), "");
/// ```
pub fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .split(PATH_DELIMITER)
        .filter_map(sanitize_segment)
        .collect::<Vec<_>>()
        .join(".")
}

/// Parses and validates a metric namespace for the statsd handler.
///
/// A valid namespace must:
/// - Start with an ASCII letter
/// - Contain only ASCII alphanumerics, underscores, hyphens or periods
/// - Not start or end with a period, nor contain empty segments
///
/// Whitespace is trimmed from the input.
///
/// ```
/// use metrics_core::util::parse_metric_namespace;
///
/// assert_eq!(parse_metric_namespace("myapp"), Some("myapp".to_string()));
/// assert_eq!(parse_metric_namespace("servers.web01"), Some("servers.web01".to_string()));
/// assert_eq!(parse_metric_namespace("1invalid"), None);
/// assert_eq!(parse_metric_namespace("my app"), None);
/// ```
pub fn parse_metric_namespace(namespace: &str) -> Option<String> {
    let trimmed = namespace.trim();
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed.starts_with(|ch: char| ch.is_ascii_alphabetic()) {
        tracing::error!(
            "metric namespace must start with a letter, got: '{}'. Ignoring namespace.",
            trimmed
        );
        return None;
    }

    if let Some(segment) = trimmed
        .split(PATH_DELIMITER)
        .find(|segment| !is_valid_segment(segment))
    {
        tracing::error!(
            "metric namespace '{}' has an invalid segment '{}'. Only ASCII alphanumerics, underscores and hyphens are allowed between periods. Ignoring namespace.",
            trimmed,
            segment
        );
        return None;
    }

    Some(trimmed.to_string())
}
