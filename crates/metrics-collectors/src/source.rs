// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Interface to the data sources queried by [`crate::database::DatabaseCollector`].

use async_trait::async_trait;
use metrics_core::tree::Tree;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SourceError {
    /// The session is unusable and must be re-established.
    #[error("connection error: {0}")]
    Connection(String),
    /// A single query failed; the session can be reused.
    #[error("query error: {0}")]
    Query(String),
}

impl SourceError {
    pub fn is_connection(&self) -> bool {
        matches!(self, SourceError::Connection(_))
    }
}

/// Establishes sessions with a server exposing per-database statistics.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    async fn connect(&self) -> Result<Self::Session, SourceError>;
}

/// A live session with the source.
#[async_trait]
pub trait Session: Send + Sync {
    /// Server-wide statistics.
    async fn server_status(&self) -> Result<Tree, SourceError>;

    /// Names of the databases hosted by the server.
    async fn database_names(&self) -> Result<Vec<String>, SourceError>;

    /// Statistics for one database.
    async fn database_stats(&self, database: &str) -> Result<Tree, SourceError>;
}
