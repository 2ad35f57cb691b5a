// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collector for database servers exposing server-wide and per-database statistics.
//!
//! One cycle reads the server status and then the statistics of every database. Server metrics
//! are published under the configured prefix and database metrics under
//! `<prefix>.databases.<name>`. Every tree of a cycle is read before anything is published, so a
//! failed query yields an empty cycle rather than a partial one.

use std::collections::HashSet;

use async_trait::async_trait;
use metrics_core::config::{optional, Options};
use metrics_core::dispatcher::Dispatcher;
use metrics_core::errors::Creation;
use metrics_core::flatten::flatten;
use metrics_core::metric::{now, Metric};
use metrics_core::tree::Tree;
use metrics_core::util::{is_valid_segment, sanitize_prefix, sanitize_segment};
use regex::Regex;
use tracing::{debug, error, warn};

use crate::collector::Collector;
use crate::source::{Connector, Session, SourceError};

#[derive(Clone, Debug, Default)]
pub struct DatabaseCollectorConfig {
    /// Path prefix for every metric of this collector (e.g., "mongo")
    pub prefix: String,
    /// Only databases whose name matches are queried; all of them when unset
    pub databases: Option<Regex>,
}

impl DatabaseCollectorConfig {
    /// Reads the optional `prefix` and `databases` options.
    pub fn from_options(options: &Options) -> Result<Self, Creation> {
        let prefix = optional(options, "prefix")
            .map(sanitize_prefix)
            .unwrap_or_default();
        let databases = optional(options, "databases")
            .map(|pattern| {
                Regex::new(pattern).map_err(|_| Creation::InvalidOption {
                    option: "databases",
                    value: pattern.to_string(),
                })
            })
            .transpose()?;
        Ok(DatabaseCollectorConfig { prefix, databases })
    }

    fn wants(&self, database: &str) -> bool {
        self.databases
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(database))
    }
}

pub struct DatabaseCollector<C: Connector> {
    name: String,
    config: DatabaseCollectorConfig,
    connector: C,
    session: Option<C::Session>,
    dispatcher: Dispatcher,
}

impl<C: Connector> DatabaseCollector<C> {
    /// Creates the collector. No connection is made until the first collection.
    pub fn new(
        name: impl Into<String>,
        config: DatabaseCollectorConfig,
        connector: C,
        dispatcher: Dispatcher,
    ) -> Self {
        DatabaseCollector {
            name: name.into(),
            config,
            connector,
            session: None,
            dispatcher,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Reads every tree of one cycle, paired with the prefix it is published under.
    async fn gather(
        session: &C::Session,
        config: &DatabaseCollectorConfig,
    ) -> Result<Vec<(String, Tree)>, SourceError> {
        let mut trees = vec![(config.prefix.clone(), session.server_status().await?)];

        let mut databases = session.database_names().await?;
        // Names that are already valid segments keep them over sanitized lookalikes.
        databases.sort_by_key(|name| !is_valid_segment(name));

        let mut segments = HashSet::new();
        for database in databases {
            if !config.wants(&database) {
                debug!("Skipping database {}", database);
                continue;
            }
            let Some(segment) = sanitize_segment(&database) else {
                debug!("Skipping database with an empty name");
                continue;
            };
            if !segments.insert(segment.clone()) {
                debug!(
                    "Skipping database {}: another database is already published as {}",
                    database, segment
                );
                continue;
            }
            let stats = session.database_stats(&database).await?;
            trees.push((database_prefix(&config.prefix, &segment), stats));
        }

        Ok(trees)
    }
}

fn database_prefix(prefix: &str, database: &str) -> String {
    if prefix.is_empty() {
        format!("databases.{database}")
    } else {
        format!("{prefix}.databases.{database}")
    }
}

#[async_trait]
impl<C: Connector> Collector for DatabaseCollector<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) {
        let timestamp = now();

        if self.session.is_none() {
            match self.connector.connect().await {
                Ok(session) => {
                    debug!("{}: connected", self.name);
                    self.session = Some(session);
                }
                Err(e) => {
                    warn!("{}: unable to connect, retrying next cycle: {}", self.name, e);
                    return;
                }
            }
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let trees = match Self::gather(session, &self.config).await {
            Ok(trees) => trees,
            Err(e) => {
                error!(
                    "{}: collection failed, nothing published this cycle: {}",
                    self.name, e
                );
                if e.is_connection() {
                    self.session = None;
                }
                return;
            }
        };

        let mut paths = HashSet::new();
        let metrics: Vec<Metric> = trees
            .iter()
            .flat_map(|(prefix, tree)| flatten(tree, prefix, timestamp))
            .filter(|metric| {
                let fresh = paths.insert(metric.path().to_string());
                if !fresh {
                    debug!("{}: skipping duplicate path {}", self.name, metric.path());
                }
                fresh
            })
            .collect();
        let published = self.dispatcher.publish_all(&metrics);
        debug!(
            "{}: published {} metrics from {} trees",
            self.name,
            published,
            trees.len()
        );
    }
}
