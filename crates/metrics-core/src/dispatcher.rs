// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fan-out from collectors to handlers.
//!
//! Every published metric is handed synchronously to each registered handler. Handlers report
//! their own failures; a handler that panics is contained here so the remaining handlers and
//! the publishing collector are unaffected.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::handler::Handler;
use crate::metric::Metric;
use tracing::error;

/// Cheap to clone; every clone publishes to the same handlers.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: Arc<Vec<Arc<dyn Handler>>>,
}

impl Dispatcher {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Dispatcher {
            handlers: Arc::new(handlers),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Delivers `metric` to every handler, one `process` call each.
    pub fn publish(&self, metric: &Metric) {
        for handler in self.handlers.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| handler.process(metric)));
            if result.is_err() {
                error!(
                    "Handler {} panicked while processing {}",
                    handler.name(),
                    metric.path()
                );
            }
        }
    }

    /// Publishes a batch, returning how many metrics were published.
    pub fn publish_all<'a>(&self, metrics: impl IntoIterator<Item = &'a Metric>) -> usize {
        let mut published = 0;
        for metric in metrics {
            self.publish(metric);
            published += 1;
        }
        published
    }
}
