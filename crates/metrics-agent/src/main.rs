// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod error;
mod registry;

use std::process::ExitCode;

use metrics_collectors::scheduler;
use metrics_core::dispatcher::Dispatcher;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AgentConfig, DEFAULT_LOG_LEVEL};

fn env_filter(log_level: &str) -> String {
    format!("h2=off,hyper=off,rustls=off,{}", log_level)
}

fn init_logging(log_level: &str) {
    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter(log_level))
                .expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = AgentConfig::from_env();
    // An invalid configuration is still reported, at the default level.
    init_logging(
        config
            .as_ref()
            .map_or(DEFAULT_LOG_LEVEL, |c| c.log_level.as_str()),
    );

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on metrics agent startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    let handlers = match registry::build_handlers(&config) {
        Ok(handlers) => handlers,
        Err(e) => {
            error!("Error creating handlers: {e}");
            return ExitCode::FAILURE;
        }
    };
    let dispatcher = Dispatcher::new(handlers);

    let collectors = match registry::build_collectors(&config, &dispatcher) {
        Ok(collectors) => collectors,
        Err(e) => {
            error!("Error creating collectors: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Starting {} collectors publishing to {} handlers",
        collectors.len(),
        dispatcher.handler_count()
    );

    let cancel_token = CancellationToken::new();
    let tasks: Vec<_> = collectors
        .into_iter()
        .map(|collector| {
            tokio::spawn(scheduler::spin(
                collector,
                config.interval,
                cancel_token.clone(),
            ))
        })
        .collect();

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!("Failed to listen for Ctrl+C, shutting down: {}", e),
    }
    cancel_token.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            error!("Collector task failed: {}", e);
        }
    }

    debug!("Metrics agent stopped");
    ExitCode::SUCCESS
}
