// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::collector::Collector;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs `collector` every `period` until `cancel_token` is cancelled.
///
/// The first collection happens immediately. A cycle that overruns delays the next one rather
/// than triggering a burst of catch-up collections.
pub async fn spin(
    mut collector: Box<dyn Collector>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    info!("Starting collector {} every {:?}", collector.name(), period);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                debug!("Collecting {}", collector.name());
                collector.collect().await;
            }
        }
    }

    debug!("Collector {} stopped", collector.name());
}
