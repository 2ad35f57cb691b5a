// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised when building a [`crate::metric::Metric`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidMetric {
    #[error("metric path is empty")]
    EmptyPath,
    #[error("metric path '{path}' has an invalid segment '{segment}'")]
    Segment { path: String, segment: String },
    #[error("metric value '{0}' is not a finite number")]
    Value(String),
}

/// Errors raised when converting a source document into a measurement tree.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TreeError {
    #[error("measurement document must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Errors raised while constructing a handler from its options.
#[derive(Debug, thiserror::Error)]
pub enum Creation {
    #[error("missing required option '{0}'")]
    MissingOption(&'static str),
    #[error("invalid value '{value}' for option '{option}'")]
    InvalidOption { option: &'static str, value: String },
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
}
