// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::errors::UnitError;

/// Options handed verbatim to a unit constructor.
///
/// An ordered mapping: keys keep the order they were written in. The runtime
/// enforces no schema; constructors use the typed accessors, which turn a
/// missing or malformed option into a [`UnitError`] so construction fails fast.
///
/// # Example
/// ```
/// use eventrix::config::UnitConfig;
///
/// let config = UnitConfig::new()
///     .with("symbol", "BTCUSDT")
///     .with("thresholds", vec![100.0, 200.0]);
///
/// assert_eq!(config.require_str("symbol").unwrap(), "BTCUSDT");
/// assert_eq!(config.require_f64_list("thresholds").unwrap(), vec![100.0, 200.0]);
/// assert!(config.require_str("exchange").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitConfig(Mapping);

impl UnitConfig {
    pub fn new() -> Self {
        Self(Mapping::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Option names in insertion order. Non-string keys are skipped.
    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().filter_map(Value::as_str).collect()
    }

    pub fn require_str(&self, key: &str) -> Result<&str, UnitError> {
        match self.get(key) {
            None | Some(Value::Null) => Err(UnitError::MissingOption(key.to_string())),
            Some(value) => value
                .as_str()
                .ok_or_else(|| UnitError::invalid_option(key, "expected a string")),
        }
    }

    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, UnitError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.require_str(key),
        }
    }

    pub fn get_u64_or(&self, key: &str, default: u64) -> Result<u64, UnitError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_u64()
                .ok_or_else(|| UnitError::invalid_option(key, "expected a non-negative integer")),
        }
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, UnitError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| UnitError::invalid_option(key, "expected a number")),
        }
    }

    pub fn require_f64_list(&self, key: &str) -> Result<Vec<f64>, UnitError> {
        self.get_f64_list(key)?
            .ok_or_else(|| UnitError::MissingOption(key.to_string()))
    }

    pub fn get_f64_list(&self, key: &str) -> Result<Option<Vec<f64>>, UnitError> {
        let items = match self.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value
                .as_sequence()
                .ok_or_else(|| UnitError::invalid_option(key, "expected a list of numbers"))?,
        };

        items
            .iter()
            .map(|item| {
                item.as_f64()
                    .ok_or_else(|| UnitError::invalid_option(key, "expected a list of numbers"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>, UnitError> {
        let items = match self.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value
                .as_sequence()
                .ok_or_else(|| UnitError::invalid_option(key, "expected a list of strings"))?,
        };

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| UnitError::invalid_option(key, "expected a list of strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// JSON rendering for status and admin snapshots.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or(serde_json::Value::Null)
    }
}

impl From<Mapping> for UnitConfig {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}
