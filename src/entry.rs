//! Raw XML entry source.
//!
//! An XML data file is a root element whose children are "entries": elements
//! whose attributes carry the sensor data. This module reads one file into an
//! ordered sequence of raw attribute maps; everything beyond attribute
//! extraction (element names, text content, nesting below the entry level)
//! is ignored.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::SensorError;

/// One raw entry: the attributes of a single XML element, in document order.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    attributes: Vec<(String, String)>,
}

impl RawEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an entry from (name, value) pairs, preserving order.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    /// Returns the first value recorded for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over (name, value) pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Reads every entry of the XML file at `path`, in document order.
///
/// Iteration is not restartable; each file is read once. An unreadable file
/// surfaces as [`SensorError::Io`], malformed XML as [`SensorError::XmlParse`].
pub fn read_entries(path: &Path) -> Result<Vec<RawEntry>, SensorError> {
    let contents = std::fs::read_to_string(path)?;
    parse_entries(&contents).map_err(|details| SensorError::XmlParse {
        file: path.to_path_buf(),
        details,
    })
}

/// Parses entries out of an XML document held in memory.
pub fn parse_entries(xml: &str) -> Result<Vec<RawEntry>, String> {
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(element) => {
                depth += 1;
                // Depth 1 is the document root; its direct children are entries.
                if depth == 2 {
                    entries.push(entry_from_element(&element)?);
                }
            }
            Event::Empty(element) => {
                if depth == 1 {
                    entries.push(entry_from_element(&element)?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

fn entry_from_element(element: &BytesStart<'_>) -> Result<RawEntry, String> {
    let mut entry = RawEntry::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        entry.push(name, value);
    }
    Ok(entry)
}
