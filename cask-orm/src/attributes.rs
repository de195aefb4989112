//! # Attributes Module
//!
//! An insertion-ordered column → [`Value`] map holding the state of a model
//! instance, plus the conversion traits between attribute maps and typed
//! structs (usually derived with `#[derive(Model)]` or
//! `#[derive(FromAttributes)]`).

use crate::{
    errors::{Error, Result},
    value::{FromValue, Value},
};

/// Column values of a row or model instance, in insertion order.
///
/// Equality ignores order: two maps are equal when they hold the same keys
/// with equal values.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, Value)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Reads an attribute as `T`. A missing key reads as `NULL`, so optional
    /// targets yield `None` instead of an error.
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T> {
        let value = self.get(key).unwrap_or(&Value::Null);
        T::from_value(value).ok_or_else(|| Error::Conversion {
            column: key.to_string(),
            expected: std::any::type_name::<T>(),
            found: value.kind().to_string(),
        })
    }

    /// Sets an attribute, keeping the original position of an existing key.
    /// Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every entry of `other` over this map.
    pub fn merge(&mut self, other: Attributes) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    /// Entries whose value differs from `original`, including keys the
    /// original never had.
    pub fn diff(&self, original: &Attributes) -> Attributes {
        self.entries
            .iter()
            .filter(|(key, value)| original.get(key) != Some(value))
            .cloned()
            .collect()
    }

    /// Keeps only the listed keys.
    pub fn only(&self, keys: &[String]) -> Attributes {
        self.entries.iter().filter(|(key, _)| keys.contains(key)).cloned().collect()
    }

    /// Drops the listed keys.
    pub fn except(&self, keys: &[String]) -> Attributes {
        self.entries.iter().filter(|(key, _)| !keys.contains(key)).cloned().collect()
    }

    /// Converts the map into a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self.entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        serde_json::Value::Object(map)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl Eq for Attributes {}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (key, value) in iter {
            attributes.insert(key, value);
        }
        attributes
    }
}

impl IntoIterator for Attributes {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl serde::Serialize for Attributes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

/// Types that can be turned into an attribute map (inputs of `fill`,
/// `create`, bulk `update`, ...).
pub trait IntoAttributes {
    fn into_attributes(self) -> Attributes;
}

impl IntoAttributes for Attributes {
    fn into_attributes(self) -> Attributes {
        self
    }
}

impl<K: Into<String>, V: Into<Value>> IntoAttributes for Vec<(K, V)> {
    fn into_attributes(self) -> Attributes {
        self.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> IntoAttributes for [(K, V); N] {
    fn into_attributes(self) -> Attributes {
        self.into_iter().collect()
    }
}

/// JSON objects map key by key; any other JSON value yields no attributes.
impl IntoAttributes for serde_json::Value {
    fn into_attributes(self) -> Attributes {
        match self {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => Attributes::new(),
        }
    }
}

/// Types that can be built from an attribute map.
///
/// Implemented by `#[derive(Model)]` and `#[derive(FromAttributes)]`.
pub trait FromAttributes: Sized {
    fn from_attributes(attributes: &Attributes) -> Result<Self>;
}

impl FromAttributes for Attributes {
    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(attributes.clone())
    }
}

/// Builds an [`Attributes`] map from `key => value` pairs.
///
/// ```rust,ignore
/// let attrs = attributes! { "title" => "A", "views" => 3 };
/// ```
#[macro_export]
macro_rules! attributes {
    () => { $crate::Attributes::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::Attributes::new();
        $( attributes.insert($key, $value); )+
        attributes
    }};
}
