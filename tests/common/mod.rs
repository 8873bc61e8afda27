//! Shared helpers for the integration test suite.

use std::sync::Arc;

use parking_lot::Mutex;

use xmldata_sensor::collector::{Collector, SendStatus};
use xmldata_sensor::context::RunContext;
use xmldata_sensor::error::Result;
use xmldata_sensor::output::CollectingSink;
use xmldata_sensor::record::CanonicalRecord;
use xmldata_sensor::schema::TomlSchemaCatalog;

/// Observation handles for a [`RecordingCollector`] owned by a run context.
#[derive(Clone, Default)]
pub struct CollectorProbe {
    pub records: Arc<Mutex<Vec<CanonicalRecord>>>,
    pub flushes: Arc<Mutex<Vec<usize>>>,
}

impl CollectorProbe {
    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn flush_sizes(&self) -> Vec<usize> {
        self.flushes.lock().clone()
    }
}

/// Collector that keeps everything it is given, for test inspection.
pub struct RecordingCollector {
    probe: CollectorProbe,
    reachable: bool,
    pending: usize,
}

impl RecordingCollector {
    pub fn new(probe: CollectorProbe, reachable: bool) -> Self {
        Self {
            probe,
            reachable,
            pending: 0,
        }
    }
}

impl Collector for RecordingCollector {
    fn add(&mut self, record: &CanonicalRecord) -> Result<()> {
        self.probe.records.lock().push(record.clone());
        self.pending += 1;
        Ok(())
    }

    fn send(&mut self) -> Result<SendStatus> {
        let count = self.pending;
        self.pending = 0;
        self.probe.flushes.lock().push(count);
        if self.reachable {
            Ok(SendStatus::Sent(count))
        } else {
            Ok(SendStatus::StoredOffline(count))
        }
    }

    fn is_reachable(&self) -> bool {
        self.reachable
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builds a run context around a recording collector and a collecting sink.
pub fn test_context(
    catalog: TomlSchemaCatalog,
    reachable: bool,
) -> (RunContext, CollectorProbe, Arc<CollectingSink>) {
    let probe = CollectorProbe::default();
    let sink = Arc::new(CollectingSink::new());
    let ctx = RunContext::new(
        Arc::new(catalog),
        Box::new(RecordingCollector::new(probe.clone(), reachable)),
        Box::new(Arc::clone(&sink)),
    );
    (ctx, probe, sink)
}

/// The FileMetric-style catalog most tests use.
pub fn file_metric_catalog() -> TomlSchemaCatalog {
    TomlSchemaCatalog::with_types([(
        "FileMetric",
        vec!["tool", "resource", "time", "tstamp", "pMap"],
    )])
}

pub fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
