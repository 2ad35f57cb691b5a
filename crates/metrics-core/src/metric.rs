// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::InvalidMetric;
use crate::util::{is_valid_segment, PATH_DELIMITER};
use ustr::Ustr;

/// The scalar carried by a [`Metric`].
#[derive(Clone, Debug, PartialEq, derive_more::Display)]
pub enum MetricValue {
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    Float(f64),
    /// A number that arrived pre-formatted, kept verbatim.
    #[display("{_0}")]
    Raw(String),
}

impl MetricValue {
    /// Numeric view of the value, used by tests and diagnostics.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Raw(v) => v.parse().ok(),
        }
    }

    fn validate(&self) -> Result<(), InvalidMetric> {
        match self {
            MetricValue::Int(_) => Ok(()),
            MetricValue::Float(v) if v.is_finite() => Ok(()),
            MetricValue::Raw(v) if v.parse::<f64>().is_ok_and(f64::is_finite) => Ok(()),
            other => Err(InvalidMetric::Value(other.to_string())),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Int(value)
    }
}

impl From<i32> for MetricValue {
    fn from(value: i32) -> Self {
        MetricValue::Int(value.into())
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

/// A single named, timestamped measurement.
///
/// Metrics are immutable once built: the constructor validates every field so a published
/// metric is always complete.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    path: Ustr,
    value: MetricValue,
    timestamp: i64,
}

impl Metric {
    /// Builds a metric, checking that `path` is a non-empty dotted path of valid segments and
    /// that `value` is a finite number.
    pub fn new(
        path: &str,
        value: impl Into<MetricValue>,
        timestamp: i64,
    ) -> Result<Self, InvalidMetric> {
        if path.is_empty() {
            return Err(InvalidMetric::EmptyPath);
        }
        if let Some(segment) = path.split(PATH_DELIMITER).find(|s| !is_valid_segment(s)) {
            return Err(InvalidMetric::Segment {
                path: path.to_string(),
                segment: segment.to_string(),
            });
        }
        let value = value.into();
        value.validate()?;
        Ok(Metric {
            path: Ustr::from(path),
            value,
            timestamp,
        })
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Seconds since the unix epoch at which the metric was collected.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Splits the path into its group (every segment but the last) and its name.
    pub fn split_path(&self) -> (Option<&str>, &str) {
        match self.path.as_str().rsplit_once(PATH_DELIMITER) {
            Some((group, name)) => (Some(group), name),
            None => (None, self.path.as_str()),
        }
    }
}

/// Current unix time in seconds.
pub fn now() -> i64 {
    std::time::UNIX_EPOCH
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .try_into()
        .unwrap_or_default()
}
