// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Measurement trees: the nested snapshot a data source returns for one query.

use std::collections::BTreeMap;

use crate::errors::TreeError;
use tracing::trace;

/// One snapshot from a data source. Keys are unique per level and the tree is finite.
pub type Tree = BTreeMap<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// A node of a measurement tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(Number),
    Text(String),
    Subtree(Tree),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::Int(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::Int(value.into()))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::Float(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Tree> for Value {
    fn from(value: Tree) -> Self {
        Value::Subtree(value)
    }
}

/// Converts a JSON document into a measurement tree.
///
/// The root must be an object. Booleans become `0`/`1`; `null` and arrays carry no scalar
/// quantity and are left out without affecting their siblings.
pub fn from_json(document: serde_json::Value) -> Result<Tree, TreeError> {
    match document {
        serde_json::Value::Object(map) => Ok(object_to_tree(map)),
        other => Err(TreeError::NotAnObject(json_kind(&other))),
    }
}

fn object_to_tree(map: serde_json::Map<String, serde_json::Value>) -> Tree {
    map.into_iter()
        .filter_map(|(key, value)| match json_to_value(value) {
            Some(value) => Some((key, value)),
            None => {
                trace!("Skipping key '{}' with no scalar value", key);
                None
            }
        })
        .collect()
}

fn json_to_value(value: serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Bool(b) => Some(Value::Number(Number::Int(i64::from(b)))),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Number(Number::Int(i)))
            } else {
                n.as_f64().map(|f| Value::Number(Number::Float(f)))
            }
        }
        serde_json::Value::String(s) => Some(Value::Text(s)),
        serde_json::Value::Object(map) => Some(Value::Subtree(object_to_tree(map))),
        serde_json::Value::Null | serde_json::Value::Array(_) => None,
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
