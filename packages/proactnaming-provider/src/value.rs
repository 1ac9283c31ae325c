//! Tri-state configuration values

use serde::Deserialize;

/// A declared value as the declarative engine sees it during planning.
///
/// `Unknown` means the value will only be known after some other resource is
/// applied; `Null` means it was explicitly left unset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub enum Value<T> {
    Known(T),
    Unknown,
    Null,
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Null
    }
}

impl<T> Value<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn known(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Known(v),
            None => Value::Null,
        }
    }
}

impl From<&str> for Value<String> {
    fn from(value: &str) -> Self {
        Value::Known(value.to_string())
    }
}

impl From<String> for Value<String> {
    fn from(value: String) -> Self {
        Value::Known(value)
    }
}
