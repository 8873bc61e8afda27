//! Entry transformation
//!
//! Turns one raw XML entry into a canonical record, or rejects it with a
//! diagnostic naming the entry's ordinal position. Rejections never abort the
//! surrounding file or run; only an unknown sensor data type does.
//!
//! Per entry: raw attribute names are resolved through the run's name map,
//! the sensor data type is taken from the entry's own `sdt` attribute or the
//! run default, attributes are partitioned into required fields and overflow
//! properties, completeness is enforced against the type's required set, and
//! the timestamp is made unique through the run's resolver.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::entry::RawEntry;
use crate::error::{Result, SensorError};
use crate::property_map::PropertyMap;
use crate::record::{
    self, CanonicalRecord, PROPERTY_MAP, RAW_RESOURCE, RAW_SDT, RAW_TOOL, RAW_TSTAMP,
};
use crate::schema::SchemaProvider;
use crate::tstamp::{self, TimestampResolver};

/// Why a single entry was not accepted. The offending entry is skipped and
/// the rest of the file proceeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryRejection {
    #[error(
        "Error: the sdt attribute must be associated with element {ordinal}. \
         Data will not be sent from the element."
    )]
    MissingSchema { ordinal: usize },

    #[error(
        "Error: the tool attribute must be associated with element {ordinal}. \
         Data will not be sent from the element."
    )]
    MissingTool { ordinal: usize },

    #[error(
        "Error: The {name} attribute is required, but does not exist. \
         Data from element {ordinal} will not be sent."
    )]
    MissingRequiredAttribute { ordinal: usize, name: String },

    #[error(
        "Error: element {ordinal} has an invalid timestamp '{text}'. \
         Data will not be sent from the element."
    )]
    BadTimestamp { ordinal: usize, text: String },
}

/// Outcome of transforming one entry.
#[derive(Debug)]
pub enum Transformed {
    Accepted(CanonicalRecord),
    Rejected(EntryRejection),
}

/// Per-run settings the transformer applies to every entry.
#[derive(Debug, Clone, Default)]
pub struct TransformSettings {
    /// Sensor data type used when an entry carries no `sdt` attribute.
    pub default_sdt: Option<String>,
    /// Resource applied to entries that do not name their own.
    pub resource: Option<String>,
    /// Raw-to-canonical attribute name mapping; identity if absent.
    pub name_map: HashMap<String, String>,
    /// Runtime marker shared by every record of the invocation, when the
    /// batch-marking mode is active.
    pub runtime_marker: Option<String>,
}

impl TransformSettings {
    fn canonical_name<'a>(&'a self, raw_name: &'a str) -> &'a str {
        self.name_map
            .get(raw_name)
            .map(String::as_str)
            .unwrap_or(raw_name)
    }
}

/// Maps raw entries to canonical records for one run.
pub struct EntryTransformer {
    provider: Arc<dyn SchemaProvider>,
    settings: TransformSettings,
    // Required-attribute sets are cached per sensor data type for the run.
    required_cache: HashMap<String, Arc<Vec<String>>>,
}

impl EntryTransformer {
    pub fn new(provider: Arc<dyn SchemaProvider>, settings: TransformSettings) -> Self {
        Self {
            provider,
            settings,
            required_cache: HashMap::new(),
        }
    }

    /// Transforms the entry at 1-based position `ordinal`.
    ///
    /// The outer `Err` is fatal (an unknown sensor data type or a codec
    /// failure while encoding overflow attributes); a [`Transformed::Rejected`]
    /// result skips only this entry.
    pub fn transform(
        &mut self,
        entry: &RawEntry,
        ordinal: usize,
        tstamps: &mut dyn TimestampResolver,
    ) -> Result<Transformed> {
        // Resolve every raw attribute name to its canonical name up front.
        let mut mapped: Vec<(String, String)> = entry
            .iter()
            .map(|(name, value)| {
                (
                    self.settings.canonical_name(name).to_string(),
                    value.to_string(),
                )
            })
            .collect();
        // A run-level resource stands in for entries that name none of their own.
        if let Some(resource) = &self.settings.resource {
            if !mapped.iter().any(|(name, _)| name == RAW_RESOURCE) {
                mapped.push((RAW_RESOURCE.to_string(), resource.clone()));
            }
        }
        let attribute = |name: &str| {
            mapped
                .iter()
                .find(|(mapped_name, _)| mapped_name == name)
                .map(|(_, value)| value.as_str())
        };

        // An entry-level sdt overrides the run default for this entry only.
        let sdt_name = match attribute(RAW_SDT).or(self.settings.default_sdt.as_deref()) {
            Some(name) => name.to_string(),
            None => return Ok(Transformed::Rejected(EntryRejection::MissingSchema { ordinal })),
        };
        let Some(tool) = attribute(RAW_TOOL).map(str::to_string) else {
            return Ok(Transformed::Rejected(EntryRejection::MissingTool { ordinal }));
        };

        let required = self.required_attributes(&sdt_name)?;

        // Partition mapped attributes into required fields and overflow
        // properties. The tstamp attribute is synthetic and handled below;
        // sdt never travels as an overflow property.
        let mut canonical = CanonicalRecord::new();
        let overflow = PropertyMap::new();
        for (name, value) in &mapped {
            if name == RAW_TSTAMP {
                continue;
            }
            if required.iter().any(|required_name| required_name == name) {
                canonical.set(name.clone(), value.clone());
            } else if name != RAW_SDT {
                overflow.put(name.clone(), value.clone());
            }
        }

        // The runtime marker counts as a required field only when the sensor
        // data type itself asks for it.
        if let Some(marker) = &self.settings.runtime_marker {
            if required.iter().any(|name| name == record::RUNTIME) {
                canonical.set(record::RUNTIME, marker.clone());
            } else {
                overflow.put(record::RUNTIME, marker.clone());
            }
        }

        // Completeness: everything the type requires must be present, apart
        // from the synthetic timestamp and the overflow field itself.
        for name in required.iter() {
            if name == RAW_TSTAMP || name == PROPERTY_MAP {
                continue;
            }
            if !canonical.contains(name) {
                return Ok(Transformed::Rejected(
                    EntryRejection::MissingRequiredAttribute {
                        ordinal,
                        name: name.clone(),
                    },
                ));
            }
        }

        // Timestamp: the entry's own tstamp when given, the current time
        // otherwise, then resolved for uniqueness.
        let candidate_millis = match attribute(RAW_TSTAMP) {
            Some(text) => match tstamp::parse_timestamp_millis(text) {
                Ok(millis) => millis,
                Err(_) => {
                    return Ok(Transformed::Rejected(EntryRejection::BadTimestamp {
                        ordinal,
                        text: text.to_string(),
                    }));
                }
            },
            None => tstamp::now_millis(),
        };
        let resolved_millis = tstamps.resolve(candidate_millis);
        let Some(timestamp) = tstamp::format_timestamp(resolved_millis) else {
            return Ok(Transformed::Rejected(EntryRejection::BadTimestamp {
                ordinal,
                text: resolved_millis.to_string(),
            }));
        };

        canonical.set(record::TOOL, tool);
        canonical.set(record::SENSOR_DATA_TYPE, sdt_name);
        canonical.set(record::TIMESTAMP, timestamp);
        if let Some(resource) = attribute(RAW_RESOURCE) {
            canonical.set(record::RESOURCE, resource.to_string());
        }
        if !overflow.is_empty() {
            canonical.set(PROPERTY_MAP, overflow.encode().map_err(SensorError::from)?);
        }

        Ok(Transformed::Accepted(canonical))
    }

    fn required_attributes(&mut self, sdt_name: &str) -> Result<Arc<Vec<String>>> {
        if let Some(required) = self.required_cache.get(sdt_name) {
            return Ok(Arc::clone(required));
        }
        let required = Arc::new(self.provider.required_attributes(sdt_name)?);
        self.required_cache
            .insert(sdt_name.to_string(), Arc::clone(&required));
        Ok(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TomlSchemaCatalog;
    use crate::tstamp::{PassthroughTstamps, UniqueTstampSet};

    fn file_metric_provider() -> Arc<dyn SchemaProvider> {
        Arc::new(TomlSchemaCatalog::with_types([(
            "FileMetric",
            vec!["tool", "resource", "time", "tstamp", "pMap"],
        )]))
    }

    fn transformer_with(settings: TransformSettings) -> EntryTransformer {
        EntryTransformer::new(file_metric_provider(), settings)
    }

    fn accept(transformer: &mut EntryTransformer, entry: &RawEntry) -> CanonicalRecord {
        let mut tstamps = UniqueTstampSet::new();
        match transformer.transform(entry, 1, &mut tstamps).unwrap() {
            Transformed::Accepted(record) => record,
            Transformed::Rejected(rejection) => panic!("unexpected rejection: {rejection}"),
        }
    }

    fn reject(transformer: &mut EntryTransformer, entry: &RawEntry) -> EntryRejection {
        let mut tstamps = UniqueTstampSet::new();
        match transformer.transform(entry, 1, &mut tstamps).unwrap() {
            Transformed::Rejected(rejection) => rejection,
            Transformed::Accepted(record) => panic!("unexpected acceptance: {record:?}"),
        }
    }

    #[test]
    fn test_name_map_resolves_to_required_attribute() {
        let mut transformer = transformer_with(TransformSettings {
            name_map: HashMap::from([("elapsedTime".to_string(), "time".to_string())]),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("sdt", "FileMetric"),
            ("elapsedTime", "10"),
        ]);
        let accepted = accept(&mut transformer, &entry);
        assert_eq!(accepted.get("time"), Some("10"));
        assert_eq!(accepted.get(record::TOOL), Some("JUnit"));
        assert_eq!(accepted.get(record::SENSOR_DATA_TYPE), Some("FileMetric"));
        assert_eq!(accepted.get(record::RESOURCE), Some("Foo.java"));
        assert!(accepted.contains(record::TIMESTAMP));
    }

    #[test]
    fn test_missing_required_attribute_rejects_entry() {
        let provider = Arc::new(TomlSchemaCatalog::with_types([(
            "FileMetric",
            vec!["tool", "resource", "time", "coverage"],
        )]));
        let mut transformer = EntryTransformer::new(provider, TransformSettings::default());
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("sdt", "FileMetric"),
            ("time", "10"),
        ]);
        let rejection = reject(&mut transformer, &entry);
        assert_eq!(
            rejection,
            EntryRejection::MissingRequiredAttribute {
                ordinal: 1,
                name: "coverage".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_schema_rejects_entry() {
        let mut transformer = transformer_with(TransformSettings::default());
        let entry = RawEntry::from_pairs([("tool", "JUnit")]);
        assert_eq!(
            reject(&mut transformer, &entry),
            EntryRejection::MissingSchema { ordinal: 1 }
        );
    }

    #[test]
    fn test_missing_tool_rejects_entry() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([("resource", "Foo.java"), ("time", "1")]);
        assert_eq!(
            reject(&mut transformer, &entry),
            EntryRejection::MissingTool { ordinal: 1 }
        );
    }

    #[test]
    fn test_entry_sdt_overrides_run_default() {
        let provider = Arc::new(TomlSchemaCatalog::with_types([
            ("FileMetric", vec!["tool", "time"]),
            ("UnitTest", vec!["tool", "name"]),
        ]));
        let mut transformer = EntryTransformer::new(
            provider,
            TransformSettings {
                default_sdt: Some("FileMetric".to_string()),
                ..Default::default()
            },
        );
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("sdt", "UnitTest"),
            ("name", "testFoo"),
        ]);
        let accepted = accept(&mut transformer, &entry);
        assert_eq!(accepted.get(record::SENSOR_DATA_TYPE), Some("UnitTest"));
    }

    #[test]
    fn test_unknown_sdt_is_fatal() {
        let mut transformer = transformer_with(TransformSettings::default());
        let entry = RawEntry::from_pairs([("tool", "JUnit"), ("sdt", "Bogus")]);
        let mut tstamps = PassthroughTstamps;
        let error = transformer.transform(&entry, 1, &mut tstamps).unwrap_err();
        assert!(matches!(error, SensorError::SchemaNotFound { name } if name == "Bogus"));
    }

    #[test]
    fn test_overflow_attributes_are_encoded() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
            ("coverage", "0.9"),
            ("branch", "main"),
        ]);
        let accepted = accept(&mut transformer, &entry);
        let overflow = PropertyMap::from_encoded(accepted.get(PROPERTY_MAP).unwrap()).unwrap();
        assert_eq!(overflow.get("coverage").as_deref(), Some("0.9"));
        assert_eq!(overflow.get("branch").as_deref(), Some("main"));
        assert_eq!(overflow.len(), 2);
    }

    #[test]
    fn test_no_overflow_field_when_nothing_overflows() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
        ]);
        let accepted = accept(&mut transformer, &entry);
        assert!(!accepted.contains(PROPERTY_MAP));
    }

    #[test]
    fn test_explicit_tstamp_is_used_and_resolved() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
            ("tstamp", "0"),
        ]);
        let accepted = accept(&mut transformer, &entry);
        assert_eq!(
            accepted.get(record::TIMESTAMP),
            Some("1970-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_duplicate_tstamps_are_uniquified() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
            ("tstamp", "1000"),
        ]);
        let mut tstamps = UniqueTstampSet::new();
        let first = match transformer.transform(&entry, 1, &mut tstamps).unwrap() {
            Transformed::Accepted(record) => record,
            other => panic!("unexpected: {other:?}"),
        };
        let second = match transformer.transform(&entry, 2, &mut tstamps).unwrap() {
            Transformed::Accepted(record) => record,
            other => panic!("unexpected: {other:?}"),
        };
        assert_ne!(
            first.get(record::TIMESTAMP),
            second.get(record::TIMESTAMP)
        );
    }

    #[test]
    fn test_unparseable_tstamp_rejects_entry() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
            ("tstamp", "yesterday"),
        ]);
        let rejection = reject(&mut transformer, &entry);
        assert!(matches!(rejection, EntryRejection::BadTimestamp { ordinal: 1, .. }));
    }

    #[test]
    fn test_runtime_marker_goes_to_overflow_when_not_required() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            runtime_marker: Some("run-42".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
        ]);
        let accepted = accept(&mut transformer, &entry);
        assert!(!accepted.contains(record::RUNTIME));
        let overflow = PropertyMap::from_encoded(accepted.get(PROPERTY_MAP).unwrap()).unwrap();
        assert_eq!(overflow.get(record::RUNTIME).as_deref(), Some("run-42"));
    }

    #[test]
    fn test_runtime_marker_is_required_field_when_schema_demands_it() {
        let provider = Arc::new(TomlSchemaCatalog::with_types([(
            "Build",
            vec!["tool", "Runtime"],
        )]));
        let mut transformer = EntryTransformer::new(
            provider,
            TransformSettings {
                default_sdt: Some("Build".to_string()),
                runtime_marker: Some("run-42".to_string()),
                ..Default::default()
            },
        );
        let entry = RawEntry::from_pairs([("tool", "Ant")]);
        let accepted = accept(&mut transformer, &entry);
        assert_eq!(accepted.get(record::RUNTIME), Some("run-42"));
        assert!(!accepted.contains(PROPERTY_MAP));
    }

    #[test]
    fn test_run_resource_applies_when_entry_has_none() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            resource: Some("src/main.rs".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([("tool", "JUnit"), ("time", "10")]);
        let accepted = accept(&mut transformer, &entry);
        // Satisfies the required "resource" attribute and the envelope field.
        assert_eq!(accepted.get("resource"), Some("src/main.rs"));
        assert_eq!(accepted.get(record::RESOURCE), Some("src/main.rs"));
    }

    #[test]
    fn test_entry_resource_wins_over_run_resource() {
        let mut transformer = transformer_with(TransformSettings {
            default_sdt: Some("FileMetric".to_string()),
            resource: Some("src/main.rs".to_string()),
            ..Default::default()
        });
        let entry = RawEntry::from_pairs([
            ("tool", "JUnit"),
            ("resource", "Foo.java"),
            ("time", "10"),
        ]);
        assert_eq!(
            accept(&mut transformer, &entry).get(record::RESOURCE),
            Some("Foo.java")
        );
    }

    #[test]
    fn test_required_set_is_cached_per_run() {
        struct CountingProvider {
            calls: std::sync::atomic::AtomicUsize,
        }
        impl SchemaProvider for CountingProvider {
            fn required_attributes(&self, _sdt_name: &str) -> Result<Vec<String>> {
                self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(vec!["tool".to_string()])
            }
        }
        let provider = Arc::new(CountingProvider {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let mut transformer = EntryTransformer::new(
            Arc::clone(&provider) as Arc<dyn SchemaProvider>,
            TransformSettings {
                default_sdt: Some("Counted".to_string()),
                ..Default::default()
            },
        );
        let entry = RawEntry::from_pairs([("tool", "JUnit")]);
        let mut tstamps = UniqueTstampSet::new();
        for ordinal in 1..=5 {
            transformer.transform(&entry, ordinal, &mut tstamps).unwrap();
        }
        assert_eq!(provider.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
