// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A [`Connector`] reading statistics from a JSON status API.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET status`: server-wide statistics (JSON object)
//! - `GET databases`: database names (JSON array of strings)
//! - `GET databases/{name}/stats`: statistics of one database (JSON object)

use std::time::Duration;

use async_trait::async_trait;
use metrics_core::config::{optional, parse, required, Options};
use metrics_core::errors::Creation;
use metrics_core::tree::{from_json, Tree};
use reqwest::{Client, Url};
use tracing::trace;

use crate::source::{Connector, Session, SourceError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct HttpJsonConnector {
    base_url: Url,
    timeout: Duration,
}

impl HttpJsonConnector {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        HttpJsonConnector { base_url, timeout }
    }

    /// Reads the required `url` and the optional `timeout_secs` options.
    pub fn from_options(options: &Options) -> Result<Self, Creation> {
        let raw_url = required(options, "url")?;
        let base_url = Url::parse(raw_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Creation::InvalidOption {
                option: "url",
                value: raw_url.to_string(),
            })?;
        let timeout = match optional(options, "timeout_secs") {
            Some(secs) => Duration::from_secs(parse("timeout_secs", secs)?),
            None => DEFAULT_TIMEOUT,
        };
        Ok(Self::new(base_url, timeout))
    }
}

#[async_trait]
impl Connector for HttpJsonConnector {
    type Session = HttpJsonSession;

    async fn connect(&self) -> Result<HttpJsonSession, SourceError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SourceError::Connection(format!("failed to build client: {e}")))?;
        Ok(HttpJsonSession {
            client,
            base_url: self.base_url.clone(),
        })
    }
}

pub struct HttpJsonSession {
    client: Client,
    base_url: Url,
}

impl HttpJsonSession {
    fn url(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Query(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, segments: &[&str]) -> Result<serde_json::Value, SourceError> {
        let url = self.url(segments)?;
        trace!("GET {}", url);
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                SourceError::Connection(format!("{url}: {e}"))
            } else {
                SourceError::Query(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Query(format!("{url} returned {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Query(format!("{url}: invalid JSON: {e}")))
    }

    async fn get_tree(&self, segments: &[&str]) -> Result<Tree, SourceError> {
        let document = self.get_json(segments).await?;
        from_json(document).map_err(|e| SourceError::Query(e.to_string()))
    }
}

#[async_trait]
impl Session for HttpJsonSession {
    async fn server_status(&self) -> Result<Tree, SourceError> {
        self.get_tree(&["status"]).await
    }

    async fn database_names(&self) -> Result<Vec<String>, SourceError> {
        match self.get_json(&["databases"]).await? {
            serde_json::Value::Array(names) => names
                .into_iter()
                .map(|name| match name {
                    serde_json::Value::String(name) => Ok(name),
                    other => Err(SourceError::Query(format!(
                        "database name must be a string, got {other}"
                    ))),
                })
                .collect(),
            other => Err(SourceError::Query(format!(
                "database list must be an array, got {other}"
            ))),
        }
    }

    async fn database_stats(&self, database: &str) -> Result<Tree, SourceError> {
        self.get_tree(&["databases", database, "stats"]).await
    }
}
