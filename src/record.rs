//! Canonical sensor data records and the attribute names they use.

use std::collections::BTreeMap;

use serde::Serialize;

/// Canonical name of the tool that produced an entry.
pub const TOOL: &str = "Tool";
/// Canonical name of the resource an entry refers to.
pub const RESOURCE: &str = "Resource";
/// Canonical name of the sensor data type a record conforms to.
pub const SENSOR_DATA_TYPE: &str = "SensorDataType";
/// Canonical name of a record's timestamp.
pub const TIMESTAMP: &str = "Timestamp";
/// Canonical name of the batch runtime marker shared by one invocation.
pub const RUNTIME: &str = "Runtime";
/// Name of the overflow field carrying attributes outside the required set.
pub const PROPERTY_MAP: &str = "pMap";

/// Raw attribute naming the tool in an XML entry.
pub const RAW_TOOL: &str = "tool";
/// Raw attribute naming the resource in an XML entry.
pub const RAW_RESOURCE: &str = "resource";
/// Raw attribute selecting a sensor data type for a single entry.
pub const RAW_SDT: &str = "sdt";
/// Raw attribute carrying an entry's own timestamp. Always synthetic in the
/// canonical record, so it is excluded from completeness checks.
pub const RAW_TSTAMP: &str = "tstamp";

/// One accepted unit of sensor data, ready for transport.
///
/// A name-to-value map over strings. Never mutated after being handed to the
/// batch accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalRecord {
    attributes: BTreeMap<String, String>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the named attribute, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Returns the named attribute's value, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterates over (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Renders the record as `[name=value, ...]` for verbose-mode output.
    pub fn verbose_string(&self) -> String {
        if self.attributes.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("[{}]", pairs.join(", "))
    }
}
