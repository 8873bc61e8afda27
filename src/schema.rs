//! Sensor data type definitions.
//!
//! A sensor data type ("sdt") names the ordered set of attributes every
//! accepted record of that type must carry. Definitions are served through
//! the [`SchemaProvider`] trait; the shipped implementation is a TOML-backed
//! catalog.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result, SensorError};

/// Supplies the ordered required-attribute list for a named sensor data type.
pub trait SchemaProvider {
    /// Returns the attributes required by `sdt_name`, in definition order.
    ///
    /// Fails with [`SensorError::SchemaNotFound`] for an unknown name; that
    /// failure is fatal for any entry depending on the type.
    fn required_attributes(&self, sdt_name: &str) -> Result<Vec<String>>;
}

/// On-disk form of a schema catalog.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: BTreeMap<String, Vec<String>>,
}

/// A catalog of sensor data types loaded from a TOML file.
///
/// ```toml
/// [types]
/// FileMetric = ["tool", "resource", "size", "tstamp", "pMap"]
/// UnitTest = ["tool", "resource", "name", "result", "tstamp"]
/// ```
#[derive(Debug, Clone)]
pub struct TomlSchemaCatalog {
    types: BTreeMap<String, Vec<String>>,
}

impl TomlSchemaCatalog {
    /// Loads a catalog from the given TOML file.
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let file: CatalogFile = toml::from_str(&contents)?;
        Ok(Self { types: file.types })
    }

    /// Builds a catalog directly from name/attribute pairs.
    pub fn with_types<N, A>(definitions: impl IntoIterator<Item = (N, Vec<A>)>) -> Self
    where
        N: Into<String>,
        A: Into<String>,
    {
        let types = definitions
            .into_iter()
            .map(|(name, attributes)| {
                (
                    name.into(),
                    attributes.into_iter().map(Into::into).collect(),
                )
            })
            .collect();
        Self { types }
    }

    /// The catalog used when no catalog file is configured: the classic
    /// sensor data types most external tools emit.
    pub fn built_in() -> Self {
        Self::with_types([
            ("Activity", vec!["tool", "resource", "type", "tstamp", "pMap"]),
            ("DevEvent", vec!["tool", "resource", "type", "tstamp", "pMap"]),
            ("FileMetric", vec!["tool", "resource", "size", "tstamp", "pMap"]),
            (
                "UnitTest",
                vec!["tool", "resource", "name", "result", "tstamp", "pMap"],
            ),
            (
                "Issue",
                vec!["tool", "resource", "id", "status", "tstamp", "pMap"],
            ),
        ])
    }

    /// Returns the names of every defined type, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

impl SchemaProvider for TomlSchemaCatalog {
    fn required_attributes(&self, sdt_name: &str) -> Result<Vec<String>> {
        self.types
            .get(sdt_name)
            .cloned()
            .ok_or_else(|| SensorError::SchemaNotFound {
                name: sdt_name.to_string(),
            })
    }
}
