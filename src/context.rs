//! Run-scoped state shared between option processing and the pipeline.
//!
//! One [`RunContext`] is owned by a single logical run and never shared
//! across concurrent invocations. Options publish resolved values (verbose
//! mode, the chosen sensor data type, the name map) here during their
//! process phase, and the side-effecting options read them back during
//! execution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::collector::Collector;
use crate::output::DiagnosticSink;
use crate::schema::SchemaProvider;
use crate::transformer::TransformSettings;
use crate::tstamp::{self, PassthroughTstamps, TimestampResolver, UniqueTstampSet};

/// The default number of accepted records per streamed flush.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 250;

/// Shared state for one sensor invocation.
pub struct RunContext {
    /// Destination for every user-facing diagnostic.
    pub sink: Box<dyn DiagnosticSink>,
    /// The transport collaborator records are handed to.
    pub collector: Box<dyn Collector>,
    /// Supplies required-attribute sets for sensor data types.
    pub schema_provider: Arc<dyn SchemaProvider>,
    /// Collector host named in send reports.
    pub host: String,
    /// Accepted-record count per streamed flush.
    pub flush_threshold: usize,

    /// True when verbose mode is on.
    pub verbose: bool,
    /// The run's default sensor data type, if one was chosen.
    pub sdt_name: Option<String>,
    /// The resource applied to entries that name none of their own.
    pub resource: Option<String>,
    /// Raw-to-canonical attribute name mapping.
    pub name_map: HashMap<String, String>,
    /// True when every record must receive a unique timestamp.
    pub unique_tstamps: bool,
    /// True when every record of this invocation shares the runtime marker.
    pub set_runtime: bool,

    runtime_marker: String,
}

impl RunContext {
    pub fn new(
        schema_provider: Arc<dyn SchemaProvider>,
        collector: Box<dyn Collector>,
        sink: Box<dyn DiagnosticSink>,
    ) -> Self {
        let runtime_marker = tstamp::format_timestamp(tstamp::now_millis())
            .unwrap_or_else(|| tstamp::now_millis().to_string());
        Self {
            sink,
            collector,
            schema_provider,
            host: "the collector".to_string(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            verbose: false,
            sdt_name: None,
            resource: None,
            name_map: HashMap::new(),
            unique_tstamps: false,
            set_runtime: false,
            runtime_marker,
        }
    }

    /// Emits a diagnostic message.
    pub fn fire_message(&self, message: &str) {
        self.sink.message(message);
    }

    /// Emits a diagnostic message only when verbose mode is on.
    pub fn fire_verbose(&self, message: &str) {
        if self.verbose {
            self.sink.message(message);
        }
    }

    /// The timestamp value shared by every record of this invocation when
    /// the batch runtime mode is active.
    pub fn runtime_marker(&self) -> &str {
        &self.runtime_marker
    }

    /// Snapshot of the transformer settings the run has accumulated.
    pub fn transform_settings(&self) -> TransformSettings {
        TransformSettings {
            default_sdt: self.sdt_name.clone(),
            resource: self.resource.clone(),
            name_map: self.name_map.clone(),
            runtime_marker: self.set_runtime.then(|| self.runtime_marker.clone()),
        }
    }

    /// Builds the timestamp resolver matching the run's uniqueness mode.
    pub fn new_tstamp_resolver(&self) -> Box<dyn TimestampResolver> {
        if self.unique_tstamps {
            Box::new(UniqueTstampSet::new())
        } else {
            Box::new(PassthroughTstamps)
        }
    }
}
