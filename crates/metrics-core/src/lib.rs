// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Core of the metrics pipeline: the [`metric::Metric`] value type, measurement trees and their
//! flattening, the [`dispatcher::Dispatcher`] fan-out and the statsd handler.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod flatten;
pub mod handler;
pub mod metric;
pub mod tree;
pub mod util;
