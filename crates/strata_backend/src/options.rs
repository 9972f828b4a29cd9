// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-call options passed through to backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An open, backend-specific bag of per-call options.
///
/// The cache never interprets these; it hands them to the backend untouched.
/// Backends decide which keys they understand.
///
/// # Examples
///
/// ```
/// use strata_backend::Options;
///
/// let opts = Options::new().with("ttl", 60);
/// assert!(opts.contains("ttl"));
/// assert!(!opts.contains("nx"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, Value>);

static EMPTY: Options = Options::new();

impl Options {
    /// Creates an empty option bag.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns a shared empty option bag.
    #[must_use]
    pub fn empty() -> &'static Self {
        &EMPTY
    }

    /// Adds an option, returning the updated bag.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if the option is present, regardless of its value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the value of an option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
