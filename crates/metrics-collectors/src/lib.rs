// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collectors probe data sources on a schedule, flatten what they read and publish the
//! resulting metrics through a [`metrics_core::dispatcher::Dispatcher`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod cgroup;
pub mod collector;
pub mod database;
pub mod http_json;
pub mod scheduler;
pub mod source;
