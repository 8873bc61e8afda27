//! Remote collector transport.
//!
//! The [`Collector`] trait is the pipeline's only view of the transport: it
//! buffers records, sends them in batches, and answers reachability probes.
//! The shipped implementation posts JSON batches over HTTP; when the
//! collector endpoint cannot be reached, batches are spooled to an offline
//! directory instead of being discarded, and the caller is told which of the
//! two happened through [`SendStatus`].

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;

use crate::error::Result;
use crate::record::CanonicalRecord;

/// What happened to one flushed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The batch reached the collector.
    Sent(usize),
    /// The collector was unreachable; the batch was stored offline.
    StoredOffline(usize),
}

impl SendStatus {
    /// The number of records the flush disposed of, either way.
    pub fn count(&self) -> usize {
        match self {
            SendStatus::Sent(count) | SendStatus::StoredOffline(count) => *count,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, SendStatus::StoredOffline(_))
    }
}

/// Transport collaborator consumed by the pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait Collector {
    /// Buffers one record for the next send.
    fn add(&mut self, record: &CanonicalRecord) -> Result<()>;

    /// Flushes every buffered record, reporting whether the batch was sent
    /// or stored offline. Buffered records are never discarded on failure.
    fn send(&mut self) -> Result<SendStatus>;

    /// Probes whether the collector endpoint currently answers.
    fn is_reachable(&self) -> bool;

    /// Releases the collector, flushing anything still buffered.
    fn close(&mut self) -> Result<()>;
}

/// Configuration for the HTTP collector client.
#[derive(Debug, Clone)]
pub struct HttpCollectorConfig {
    /// Base URL of the collector service.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// User agent string.
    pub user_agent: String,
    /// Directory receiving batches the collector could not be sent.
    pub offline_dir: PathBuf,
}

impl Default for HttpCollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9876/xmldata".to_string(),
            timeout_seconds: 30,
            user_agent: format!("xmldata-sensor/{}", env!("CARGO_PKG_VERSION")),
            offline_dir: dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("xmldata-sensor")
                .join("offline"),
        }
    }
}

/// HTTP collector client.
///
/// The pipeline itself is synchronous, so the async reqwest client is driven
/// through an owned current-thread runtime at the send boundary.
pub struct HttpCollector {
    runtime: tokio::runtime::Runtime,
    client: Client,
    config: HttpCollectorConfig,
    buffer: Vec<CanonicalRecord>,
}

impl HttpCollector {
    /// Creates a collector client with the given configuration.
    pub fn new(config: HttpCollectorConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            runtime,
            client,
            config,
            buffer: Vec::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Writes the buffered batch to the offline directory and clears the
    /// buffer; the spool now owns those records.
    fn store_offline(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.config.offline_dir)?;
        let name = format!(
            "batch-{}.json",
            chrono::Utc::now().format("%Y%m%d%H%M%S%3f")
        );
        let contents = serde_json::to_string_pretty(&self.buffer)?;
        std::fs::write(self.config.offline_dir.join(name), contents)?;
        self.buffer.clear();
        Ok(())
    }
}

impl Collector for HttpCollector {
    fn add(&mut self, record: &CanonicalRecord) -> Result<()> {
        self.buffer.push(record.clone());
        Ok(())
    }

    fn send(&mut self) -> Result<SendStatus> {
        if self.buffer.is_empty() {
            return Ok(SendStatus::Sent(0));
        }
        let count = self.buffer.len();

        if !self.is_reachable() {
            self.store_offline()?;
            return Ok(SendStatus::StoredOffline(count));
        }

        let url = self.endpoint("sensordata");
        let response = self
            .runtime
            .block_on(async { self.client.post(&url).json(&self.buffer).send().await });
        match response {
            Ok(response) if response.status().is_success() => {
                self.buffer.clear();
                Ok(SendStatus::Sent(count))
            }
            // The endpoint answered the probe but refused or lost the batch;
            // degrade to offline storage rather than dropping records.
            _ => {
                self.store_offline()?;
                Ok(SendStatus::StoredOffline(count))
            }
        }
    }

    fn is_reachable(&self) -> bool {
        let url = self.endpoint("ping");
        self.runtime
            .block_on(async { self.client.get(&url).send().await })
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn close(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.send()?;
        }
        Ok(())
    }
}
