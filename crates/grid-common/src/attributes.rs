//! Insertion-ordered attribute maps.
//!
//! Attribute order is part of the archive's observable output, so the map
//! keeps entries in the order they were first set. Replacing a value keeps
//! its original position.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Double(f64),
    Text(String),
    IntArray(Vec<i64>),
    DoubleArray(Vec<f64>),
}

impl AttributeValue {
    /// Borrow the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric scalar view of the value (first element for arrays).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Double(v) => Some(*v),
            AttributeValue::IntArray(v) => v.first().map(|x| *x as f64),
            AttributeValue::DoubleArray(v) => v.first().copied(),
            AttributeValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// All numeric elements of the value.
    pub fn as_f64_vec(&self) -> Vec<f64> {
        match self {
            AttributeValue::IntArray(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::DoubleArray(v) => v.clone(),
            other => other.as_f64().into_iter().collect(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Double(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => write!(f, "\"{}\"", s),
            AttributeValue::IntArray(v) => write!(f, "{:?}", v),
            AttributeValue::DoubleArray(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value as i64)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        AttributeValue::IntArray(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::DoubleArray(value)
    }
}

/// Ordered attribute map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute. An existing entry keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttributeValue::as_f64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Copy every entry of `other` into this map, in `other`'s order.
    pub fn extend_from(&mut self, other: &Attributes) {
        for (name, value) in other.iter() {
            self.set(name, value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if every entry in `other` is present here with the same value.
    pub fn is_superset_of(&self, other: &Attributes) -> bool {
        other.iter().all(|(name, value)| self.get(name) == Some(value))
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of attribute names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Attributes, A::Error> {
                let mut attrs = Attributes::new();
                while let Some((name, value)) = access.next_entry::<String, AttributeValue>()? {
                    attrs.set(name, value);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_preserves_insertion_order() {
        let mut attrs = Attributes::new();
        attrs.set("units", "K");
        attrs.set("long_name", "Temperature");
        attrs.set("units", "degC");

        let names: Vec<&str> = attrs.names().collect();
        assert_eq!(names, vec!["units", "long_name"]);
        assert_eq!(attrs.get_str("units"), Some("degC"));
    }

    #[test]
    fn test_json_keeps_order_and_types() {
        let attrs = Attributes::new()
            .with("zeta", "last-alphabetically")
            .with("semi_major_axis", 6378137.0)
            .with("longitude_of_prime_meridian", 0)
            .with("valid_range", vec![0.5, 1.5]);

        let json = serde_json::to_string(&attrs).unwrap();
        assert!(json.starts_with("{\"zeta\""));

        let restored: Attributes = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, attrs);
        assert_eq!(
            restored.get("longitude_of_prime_meridian"),
            Some(&AttributeValue::Int(0))
        );
    }

    #[test]
    fn test_superset() {
        let source = Attributes::new().with("units", "K");
        let target = source.clone().with("coordinates", "lon lat");
        assert!(target.is_superset_of(&source));
        assert!(!source.is_superset_of(&target));
    }
}
