//! # xmldata-sensor Library
//!
//! A command-line sensor that ingests batches of loosely-structured XML
//! entries, normalizes each entry into a canonical attribute record against
//! a named sensor data type, assigns unique timestamps, and ships record
//! batches to a remote collector, with offline spooling when the collector
//! is unreachable.

pub mod batch;
pub mod cli;
pub mod codec;
pub mod collector;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod options;
pub mod output;
pub mod property_map;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod transformer;
pub mod tstamp;

pub use batch::{BatchAccumulator, FlushMode, SendOutcome};
pub use cli::Cli;
pub use collector::{Collector, HttpCollector, HttpCollectorConfig, SendStatus};
pub use config::SensorConfig;
pub use context::RunContext;
pub use entry::RawEntry;
pub use error::{CodecError, ConfigError, PropertyMapError, Result, SensorError};
pub use options::{SensorOption, create_option};
pub use output::{CollectingSink, ConsoleSink, DiagnosticSink};
pub use property_map::PropertyMap;
pub use record::CanonicalRecord;
pub use registry::OptionRegistry;
pub use resolver::{ArgumentResolver, run_invocation};
pub use schema::{SchemaProvider, TomlSchemaCatalog};
pub use transformer::{EntryRejection, EntryTransformer, TransformSettings, Transformed};
pub use tstamp::{PassthroughTstamps, TimestampResolver, UniqueTstampSet};
