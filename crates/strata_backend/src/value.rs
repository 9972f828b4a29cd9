// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The default value type stored by backends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A value stored in or retrieved from a backend.
///
/// Absence is not a variant: a missing value is `None` at every API boundary, which keeps
/// a stored `false`, `0`, or empty string distinguishable from "nothing here".
///
/// # Examples
///
/// ```
/// use strata_backend::StorageValue;
///
/// let flag = StorageValue::from(false);
/// assert_eq!(flag.as_bool(), Some(false));
///
/// let text = StorageValue::from("");
/// assert_eq!(text.as_str(), Some(""));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StorageValue {
    /// A boolean.
    Bool(bool),
    /// An integer or floating point number.
    Number(Number),
    /// A string.
    String(String),
    /// A structured record.
    Record(Map<String, Value>),
}

impl StorageValue {
    /// Converts a JSON value into a storage value.
    ///
    /// `null` maps to `None` (absent). Arrays are not storable on their own and also map to `None`.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null | Value::Array(_) => None,
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Number(n) => Some(Self::Number(n)),
            Value::String(s) => Some(Self::String(s)),
            Value::Object(map) => Some(Self::Record(map)),
        }
    }

    /// Converts this value into its JSON representation.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::String(s) => Value::String(s),
            Self::Record(map) => Value::Object(map),
        }
    }

    /// Returns the string if this value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this value is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number as `i64` if it is representable as one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the number as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the record if this value is a record.
    #[must_use]
    pub fn as_record(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Record(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for StorageValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for StorageValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for StorageValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for StorageValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for StorageValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for StorageValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Map<String, Value>> for StorageValue {
    fn from(value: Map<String, Value>) -> Self {
        Self::Record(value)
    }
}

impl From<StorageValue> for Value {
    fn from(value: StorageValue) -> Self {
        value.into_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_values_are_present() {
        assert_eq!(StorageValue::from(false).as_bool(), Some(false));
        assert_eq!(StorageValue::from(0).as_i64(), Some(0));
        assert_eq!(StorageValue::from("").as_str(), Some(""));
    }

    #[test]
    fn null_json_is_absent() {
        assert_eq!(StorageValue::from_json(Value::Null), None);
    }

    #[test]
    fn record_round_trips_through_json() {
        let value: Value = serde_json::json!({"name": "ada", "admin": true});
        let stored = StorageValue::from_json(value.clone()).expect("objects are storable");
        assert!(stored.as_record().is_some());
        assert_eq!(stored.into_json(), value);
    }

    #[test]
    fn untagged_serialization_is_plain_json() {
        let text = serde_json::to_string(&StorageValue::from("hello")).expect("serialize");
        assert_eq!(text, "\"hello\"");

        let parsed: StorageValue = serde_json::from_str("42").expect("deserialize");
        assert_eq!(parsed.as_i64(), Some(42));
    }
}
