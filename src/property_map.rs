//! Thread-safe property map carried by sensor data records.
//!
//! Accepts only strings as keys and values, can be encoded into a single
//! string for transport via the string list codec, and can be rebuilt from
//! that encoded form. Puts and gets are safe under concurrent use without
//! external locking; callers must not assume atomicity across separate calls.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::codec;
use crate::error::{CodecError, PropertyMapError};

/// The fixed encoding of an empty property map.
pub const EMPTY_ENCODED: &str = "0000";

/// A thread-safe string-to-string property map.
#[derive(Debug, Default)]
pub struct PropertyMap {
    properties: RwLock<HashMap<String, String>>,
}

impl PropertyMap {
    /// Creates an empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a property map from a string produced by [`PropertyMap::encode`].
    ///
    /// Fails if the codec rejects the string, or if the decoded element count
    /// is odd (a dangling key with no value).
    pub fn from_encoded(encoded: &str) -> Result<Self, PropertyMapError> {
        let elements = codec::decode(encoded)?;
        if elements.len() % 2 != 0 {
            return Err(PropertyMapError::DanglingKey {
                count: elements.len(),
            });
        }
        let map = Self::new();
        let mut pairs = elements.into_iter();
        while let (Some(name), Some(value)) = (pairs.next(), pairs.next()) {
            map.put(name, value);
        }
        Ok(map)
    }

    /// Puts the (name, value) pair into the map.
    pub fn put(&self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(name.into(), value.into());
    }

    /// Gets the value associated with `name`, or `None` if not found.
    pub fn get(&self, name: &str) -> Option<String> {
        self.properties.read().get(name).cloned()
    }

    /// Gets the value associated with `name`, or `default` if not found.
    pub fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    /// Gets the value whose key matches `name` case-insensitively.
    ///
    /// Property maps do not hold large numbers of elements, so a linear scan
    /// is acceptable. The first match wins; order across equal-ignoring-case
    /// duplicates is unspecified.
    pub fn get_ignore_case(&self, name: &str) -> Option<String> {
        let properties = self.properties.read();
        properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    /// Returns the "runTime" value, trying "runTime" then "runtime".
    ///
    /// Both spellings have been observed in the wild; when both are present
    /// the "runTime" value wins.
    pub fn get_run_time(&self) -> Option<String> {
        self.get("runTime").or_else(|| self.get("runtime"))
    }

    /// Returns the keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.properties.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of properties in the map.
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    /// Returns true if the map holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }

    /// Encodes the contents of this map into a single transportable string.
    ///
    /// Pairs are flattened in sorted key order so that equal maps always
    /// encode identically; an empty map encodes to [`EMPTY_ENCODED`].
    pub fn encode(&self) -> Result<String, CodecError> {
        let properties = self.properties.read();
        let mut names: Vec<&String> = properties.keys().collect();
        names.sort();

        let mut flattened = Vec::with_capacity(properties.len() * 2);
        for name in names {
            flattened.push(name.as_str());
            flattened.push(properties[name].as_str());
        }
        codec::encode(&flattened)
    }
}
