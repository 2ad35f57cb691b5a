// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Option maps handed to collectors and handlers at construction time.

use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::Creation;

/// Recognized options of one component, keyed by lowercase option name.
pub type Options = HashMap<String, String>;

/// Returns the trimmed value of a required option.
pub fn required<'a>(options: &'a Options, option: &'static str) -> Result<&'a str, Creation> {
    options
        .get(option)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(Creation::MissingOption(option))
}

/// Returns the trimmed value of an option if it is set and non-empty.
pub fn optional<'a>(options: &'a Options, option: &'static str) -> Option<&'a str> {
    options
        .get(option)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parses an option value, reporting the option name on failure.
pub fn parse<T: FromStr>(option: &'static str, value: &str) -> Result<T, Creation> {
    value.parse().map_err(|_| Creation::InvalidOption {
        option,
        value: value.to_string(),
    })
}
