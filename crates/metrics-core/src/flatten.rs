// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flattening of measurement trees into dotted-path metrics.
//!
//! The walk is depth-first. Numeric leaves (and text leaves holding a finite number) become one
//! [`Metric`] each, named by the dot-joined key sequence from the root. Other text leaves are
//! dropped, subtrees are recursed into, and every metric of one call shares one timestamp.
//!
//! Keys are sanitized with [`sanitize_segment`]: characters outside `[A-Za-z0-9_-]` become
//! `_`, and an empty key is skipped together with everything below it. Every path is published
//! at most once per call. Keys that are already valid segments are walked before sanitized
//! siblings, so a sanitized key landing on an existing path is the one dropped.

use std::collections::HashSet;

use crate::metric::{now, Metric, MetricValue};
use crate::tree::{Number, Tree, Value};
use crate::util::{is_valid_segment, sanitize_prefix, sanitize_segment, PATH_DELIMITER};
use tracing::debug;

/// Flattens `tree` under `prefix`, stamping every metric with `timestamp`.
///
/// An empty prefix puts the root keys at the top of the namespace. The order of the returned
/// metrics is not part of the contract.
pub fn flatten(tree: &Tree, prefix: &str, timestamp: i64) -> Vec<Metric> {
    let mut walk = Walk {
        path: sanitize_prefix(prefix),
        timestamp,
        emitted: HashSet::new(),
        metrics: Vec::new(),
    };
    walk.tree(tree);
    walk.metrics
}

/// Flattens `tree` with the current time as the shared timestamp.
pub fn flatten_now(tree: &Tree, prefix: &str) -> Vec<Metric> {
    flatten(tree, prefix, now())
}

struct Walk {
    path: String,
    timestamp: i64,
    emitted: HashSet<String>,
    metrics: Vec<Metric>,
}

impl Walk {
    fn tree(&mut self, tree: &Tree) {
        let (exact, renamed): (Vec<_>, Vec<_>) =
            tree.iter().partition(|(key, _)| is_valid_segment(key));

        for (key, value) in exact.into_iter().chain(renamed) {
            let Some(segment) = sanitize_segment(key) else {
                debug!("Skipping empty key under '{}'", self.path);
                continue;
            };

            let mark = self.path.len();
            if !self.path.is_empty() {
                self.path.push(PATH_DELIMITER);
            }
            self.path.push_str(&segment);

            match value {
                Value::Subtree(subtree) => self.tree(subtree),
                leaf => self.leaf(key, leaf),
            }

            self.path.truncate(mark);
        }
    }

    fn leaf(&mut self, key: &str, leaf: &Value) {
        let Some(metric_value) = leaf_value(leaf) else {
            return;
        };
        if self.emitted.contains(&self.path) {
            debug!(
                "Skipping key '{}': '{}' was already published",
                key, self.path
            );
            return;
        }
        match Metric::new(&self.path, metric_value, self.timestamp) {
            Ok(metric) => {
                self.emitted.insert(self.path.clone());
                self.metrics.push(metric);
            }
            Err(e) => debug!("Skipping leaf '{}': {}", self.path, e),
        }
    }
}

fn leaf_value(value: &Value) -> Option<MetricValue> {
    match value {
        Value::Number(Number::Int(v)) => Some(MetricValue::Int(*v)),
        Value::Number(Number::Float(v)) if v.is_finite() => Some(MetricValue::Float(*v)),
        Value::Number(Number::Float(v)) => {
            debug!("Skipping non-finite value {}", v);
            None
        }
        Value::Text(text) => {
            let trimmed = text.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|_| MetricValue::Raw(trimmed.to_string()))
        }
        Value::Subtree(_) => None,
    }
}
