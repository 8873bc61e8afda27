use std::path::PathBuf;

use thiserror::Error;

use crate::codec;

/// Errors raised by the string list codec. These are always fatal to the
/// specific encode/decode call; the codec never substitutes partial output.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("string list exceeds {max} elements: {count}", max = codec::MAX_NUM_STRINGS)]
    TooManyElements { count: usize },

    #[error(
        "string list element {index} exceeds {max} characters: {length}",
        max = codec::MAX_STRING_LENGTH
    )]
    ElementTooLong { index: usize, length: usize },

    #[error("malformed {field} field at offset {offset}")]
    MalformedField { field: &'static str, offset: usize },

    #[error("encoded string not consumed exactly: cursor {cursor}, length {length}")]
    TruncatedOrOverlongEncoding { cursor: usize, length: usize },
}

/// Errors raised when rebuilding a property map from its encoded form.
#[derive(Error, Debug)]
pub enum PropertyMapError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("encoded property map has a dangling key: {count} decoded elements")]
    DanglingKey { count: usize },
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("invalid configuration value: {field} = {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("property map error: {0}")]
    PropertyMap(#[from] PropertyMapError),

    #[error("the sensor data type '{name}' does not exist")]
    SchemaNotFound { name: String },

    #[error("failed to parse XML file: {file} - {details}")]
    XmlParse { file: PathBuf, details: String },

    #[error("invalid timestamp '{text}': {reason}")]
    Timestamp { text: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid arguments: {details}")]
    InvalidArguments { details: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SensorError>;
