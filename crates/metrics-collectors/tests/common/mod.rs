// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test doubles shared by the collector integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use metrics_collectors::source::{Connector, Session, SourceError};
use metrics_core::dispatcher::Dispatcher;
use metrics_core::handler::Handler;
use metrics_core::metric::{Metric, MetricValue};
use metrics_core::tree::{from_json, Tree};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Handler keeping every metric it is given
#[derive(Default)]
pub struct RecordingHandler {
    metrics: Mutex<Vec<Metric>>,
}

impl RecordingHandler {
    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().unwrap().clone()
    }

    pub fn published(&self) -> BTreeMap<String, MetricValue> {
        self.metrics()
            .into_iter()
            .map(|m| (m.path().to_string(), m.value().clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.metrics.lock().unwrap().clear();
    }
}

impl Handler for RecordingHandler {
    fn name(&self) -> &str {
        "recording"
    }

    fn process(&self, metric: &Metric) {
        self.metrics.lock().unwrap().push(metric.clone());
    }
}

pub fn recording_dispatcher() -> (Arc<RecordingHandler>, Dispatcher) {
    let recording = Arc::new(RecordingHandler::default());
    let handler: Arc<dyn Handler> = recording.clone();
    (recording, Dispatcher::new(vec![handler]))
}

pub fn tree(document: serde_json::Value) -> Tree {
    from_json(document).unwrap()
}

pub fn values(pairs: &[(&str, i64)]) -> BTreeMap<String, MetricValue> {
    pairs
        .iter()
        .map(|(path, value)| (path.to_string(), MetricValue::Int(*value)))
        .collect()
}

/// Scripted source state, shared between the connector and its sessions
pub struct MockState {
    pub server_status: Result<Tree, SourceError>,
    pub databases: Result<Vec<String>, SourceError>,
    pub database_stats: HashMap<String, Result<Tree, SourceError>>,
    pub connect_failures_left: usize,
    pub connects: usize,
    pub stats_queries: Vec<String>,
}

#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new(server_status: Tree) -> Self {
        MockConnector {
            state: Arc::new(Mutex::new(MockState {
                server_status: Ok(server_status),
                databases: Ok(Vec::new()),
                database_stats: HashMap::new(),
                connect_failures_left: 0,
                connects: 0,
                stats_queries: Vec::new(),
            })),
        }
    }

    pub fn with_database(self, name: &str, stats: Tree) -> Self {
        {
            let mut state = self.state();
            if let Ok(databases) = state.databases.as_mut() {
                databases.push(name.to_string());
            }
            state.database_stats.insert(name.to_string(), Ok(stats));
        }
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self) -> Result<MockSession, SourceError> {
        let mut state = self.state();
        state.connects += 1;
        if state.connect_failures_left > 0 {
            state.connect_failures_left -= 1;
            return Err(SourceError::Connection("connection refused".to_string()));
        }
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl Session for MockSession {
    async fn server_status(&self) -> Result<Tree, SourceError> {
        self.state.lock().unwrap().server_status.clone()
    }

    async fn database_names(&self) -> Result<Vec<String>, SourceError> {
        self.state.lock().unwrap().databases.clone()
    }

    async fn database_stats(&self, database: &str) -> Result<Tree, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.stats_queries.push(database.to_string());
        state
            .database_stats
            .get(database)
            .cloned()
            .unwrap_or_else(|| Err(SourceError::Query(format!("no such database {database}"))))
    }
}
