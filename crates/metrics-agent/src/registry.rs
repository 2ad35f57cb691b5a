// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Maps component names to constructed handlers and collectors.

use std::sync::Arc;

use metrics_collectors::cgroup::CgroupCpuCollector;
use metrics_collectors::collector::Collector;
use metrics_collectors::database::{DatabaseCollector, DatabaseCollectorConfig};
use metrics_collectors::http_json::HttpJsonConnector;
use metrics_core::dispatcher::Dispatcher;
use metrics_core::errors::Creation;
use metrics_core::handler::statsd::{StatsdConfig, StatsdHandler, DEFAULT_STATSD_PORT};
use metrics_core::handler::Handler;
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::AgentError;

const DEFAULT_STATSD_HOST: &str = "127.0.0.1";

fn creation_error(name: &str) -> impl FnOnce(Creation) -> AgentError + '_ {
    move |source| AgentError::Creation {
        name: name.to_string(),
        source,
    }
}

fn build_handler(config: &AgentConfig, name: &str) -> Result<Arc<dyn Handler>, AgentError> {
    let mut options = config.options(name);
    match name {
        "statsd" => {
            options
                .entry("host".to_string())
                .or_insert_with(|| DEFAULT_STATSD_HOST.to_string());
            options
                .entry("port".to_string())
                .or_insert_with(|| DEFAULT_STATSD_PORT.to_string());
            let statsd_config = StatsdConfig::from_options(&options).map_err(creation_error(name))?;
            let handler = StatsdHandler::connect(&statsd_config).map_err(creation_error(name))?;
            Ok(Arc::new(handler))
        }
        _ => Err(AgentError::UnknownComponent {
            kind: "handler",
            name: name.to_string(),
        }),
    }
}

fn build_collector(
    config: &AgentConfig,
    name: &str,
    dispatcher: &Dispatcher,
) -> Result<Box<dyn Collector>, AgentError> {
    let options = config.options(name);
    match name {
        "database" => {
            let connector = HttpJsonConnector::from_options(&options).map_err(creation_error(name))?;
            let collector_config =
                DatabaseCollectorConfig::from_options(&options).map_err(creation_error(name))?;
            Ok(Box::new(DatabaseCollector::new(
                name,
                collector_config,
                connector,
                dispatcher.clone(),
            )))
        }
        "cgroup" => {
            let collector = CgroupCpuCollector::from_options(name, &options, dispatcher.clone())
                .map_err(creation_error(name))?;
            Ok(Box::new(collector))
        }
        _ => Err(AgentError::UnknownComponent {
            kind: "collector",
            name: name.to_string(),
        }),
    }
}

/// Builds every configured handler, failing on the first one that cannot be created.
pub fn build_handlers(config: &AgentConfig) -> Result<Vec<Arc<dyn Handler>>, AgentError> {
    config
        .handlers
        .iter()
        .map(|name| {
            let handler = build_handler(config, name)?;
            debug!("Created handler {}", handler.name());
            Ok(handler)
        })
        .collect()
}

/// Builds every configured collector, each publishing to `dispatcher`.
pub fn build_collectors(
    config: &AgentConfig,
    dispatcher: &Dispatcher,
) -> Result<Vec<Box<dyn Collector>>, AgentError> {
    config
        .collectors
        .iter()
        .map(|name| {
            let collector = build_collector(config, name, dispatcher)?;
            debug!("Created collector {}", collector.name());
            Ok(collector)
        })
        .collect()
}
