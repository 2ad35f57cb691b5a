// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

/// A periodic probe of one data source.
///
/// `collect` is invoked repeatedly by the scheduler. Each call is independent: it reads the
/// source, flattens the result and publishes the metrics. Source failures are logged and turn
/// into an empty cycle; they never escape `collect`.
#[async_trait]
pub trait Collector: Send {
    /// Instance name used in logs.
    fn name(&self) -> &str;

    async fn collect(&mut self);
}
