// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use metrics_core::errors::Creation;

/// Errors that stop the agent at startup
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown {kind} '{name}'")]
    UnknownComponent { kind: &'static str, name: String },

    #[error("Failed to create {name}: {source}")]
    Creation {
        name: String,
        #[source]
        source: Creation,
    },
}
