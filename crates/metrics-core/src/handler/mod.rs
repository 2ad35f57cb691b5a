// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery sinks for published metrics.

pub mod statsd;

use crate::metric::Metric;

/// Consumes metrics one at a time and forwards them to a backend.
///
/// `process` may be called concurrently from any number of collectors. It returns once
/// delivery has been attempted; failures are logged by the handler and never surface to the
/// caller.
pub trait Handler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn process(&self, metric: &Metric);
}
