// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Name to value argument bag handed to handlers

use crate::error::HandlerError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Arguments of one call, forwarded opaquely from the tool layer.
///
/// A JSON `null` counts as not supplied. An empty string or list is supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationParameters {
    values: HashMap<String, Value>,
}

impl OperationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Raw lookup; `None` when absent or null
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Typed lookup of an argument the handler cannot work without
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        match self.optional(name)? {
            Some(value) => Ok(value),
            None => Err(HandlerError::MissingParameter(name.to_string())),
        }
    }

    /// Typed lookup returning `Ok(None)` when the argument was not supplied
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, HandlerError> {
        self.get(name)
            .map(|value| {
                T::deserialize(value).map_err(|e| HandlerError::invalid(name, e.to_string()))
            })
            .transpose()
    }
}

impl From<Map<String, Value>> for OperationParameters {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, Value)> for OperationParameters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
