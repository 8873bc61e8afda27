//! Batch accumulation and flushing.
//!
//! Accepted records are handed to the transport collaborator as they arrive;
//! the accumulator decides when the collaborator's buffer is flushed. In
//! streamed mode a flush happens after every `threshold` accepted records so
//! memory stays bounded for very large inputs; in single-shot mode the whole
//! run flushes once at the end. Transport failures never discard buffered
//! records: the collaborator spools them offline and says so through its
//! return signal.

use crate::collector::SendStatus;
use crate::context::RunContext;
use crate::error::Result;
use crate::record::CanonicalRecord;

/// When accumulated records are flushed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Flush after every `threshold` accepted records.
    Streamed,
    /// Flush once, when the run finishes.
    SingleShot,
}

/// Totals for one finished accumulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOutcome {
    /// Records accepted into the batch.
    pub accepted: usize,
    /// Records confirmed sent to the collector.
    pub sent: usize,
    /// Records the collector stored offline instead.
    pub stored_offline: usize,
}

impl SendOutcome {
    /// True when any flush fell back to offline storage.
    pub fn any_offline(&self) -> bool {
        self.stored_offline > 0
    }
}

/// Buffers canonical records and applies the flush policy.
#[derive(Debug)]
pub struct BatchAccumulator {
    mode: FlushMode,
    threshold: usize,
    pending: usize,
    outcome: SendOutcome,
}

impl BatchAccumulator {
    pub fn new(mode: FlushMode, threshold: usize) -> Self {
        Self {
            mode,
            threshold: threshold.max(1),
            pending: 0,
            outcome: SendOutcome::default(),
        }
    }

    /// The number of records accepted so far.
    pub fn accepted(&self) -> usize {
        self.outcome.accepted
    }

    /// Accepts one record, flushing if the streamed threshold is reached.
    pub fn accept(&mut self, ctx: &mut RunContext, record: &CanonicalRecord) -> Result<()> {
        ctx.collector.add(record)?;
        self.pending += 1;
        self.outcome.accepted += 1;
        if self.mode == FlushMode::Streamed && self.pending >= self.threshold {
            self.flush(ctx)?;
        }
        Ok(())
    }

    /// Flushes whatever remains and returns the run's totals.
    pub fn finish(mut self, ctx: &mut RunContext) -> Result<SendOutcome> {
        self.flush(ctx)?;
        Ok(self.outcome)
    }

    fn flush(&mut self, ctx: &mut RunContext) -> Result<()> {
        let status = ctx.collector.send()?;
        self.pending = 0;
        match status {
            SendStatus::Sent(count) => self.outcome.sent += count,
            SendStatus::StoredOffline(count) => self.outcome.stored_offline += count,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockCollector;
    use crate::output::CollectingSink;
    use crate::record;
    use crate::schema::TomlSchemaCatalog;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Collector mock that records the size of every flush it receives.
    fn flush_tracking_collector(
        flushes: Arc<Mutex<Vec<usize>>>,
        status_of: fn(usize) -> SendStatus,
    ) -> MockCollector {
        let pending = Arc::new(AtomicUsize::new(0));
        let mut mock = MockCollector::new();
        mock.expect_add().returning({
            let pending = Arc::clone(&pending);
            move |_| {
                pending.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        mock.expect_send().returning({
            let pending = Arc::clone(&pending);
            move || {
                let count = pending.swap(0, Ordering::SeqCst);
                flushes.lock().push(count);
                Ok(status_of(count))
            }
        });
        mock
    }

    fn context_with(collector: MockCollector) -> RunContext {
        RunContext::new(
            Arc::new(TomlSchemaCatalog::built_in()),
            Box::new(collector),
            Box::new(CollectingSink::new()),
        )
    }

    fn sample_record() -> CanonicalRecord {
        let mut sample = CanonicalRecord::new();
        sample.set(record::TOOL, "JUnit");
        sample
    }

    #[test]
    fn test_streamed_mode_flushes_at_threshold() {
        let flushes = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_with(flush_tracking_collector(
            Arc::clone(&flushes),
            SendStatus::Sent,
        ));

        let mut batch = BatchAccumulator::new(FlushMode::Streamed, 250);
        let record = sample_record();
        for _ in 0..251 {
            batch.accept(&mut ctx, &record).unwrap();
        }
        let outcome = batch.finish(&mut ctx).unwrap();

        // Exactly one intermediate flush of 250, then the final flush of 1.
        assert_eq!(flushes.lock().clone(), vec![250, 1]);
        assert_eq!(outcome.accepted, 251);
        assert_eq!(outcome.sent, 251);
        assert_eq!(outcome.stored_offline, 0);
    }

    #[test]
    fn test_single_shot_mode_flushes_once() {
        let flushes = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_with(flush_tracking_collector(
            Arc::clone(&flushes),
            SendStatus::Sent,
        ));

        let mut batch = BatchAccumulator::new(FlushMode::SingleShot, 250);
        let record = sample_record();
        for _ in 0..300 {
            batch.accept(&mut ctx, &record).unwrap();
        }
        let outcome = batch.finish(&mut ctx).unwrap();

        assert_eq!(flushes.lock().clone(), vec![300]);
        assert_eq!(outcome.sent, 300);
    }

    #[test]
    fn test_offline_flushes_are_counted_not_dropped() {
        let flushes = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_with(flush_tracking_collector(
            Arc::clone(&flushes),
            SendStatus::StoredOffline,
        ));

        let mut batch = BatchAccumulator::new(FlushMode::Streamed, 2);
        let record = sample_record();
        for _ in 0..5 {
            batch.accept(&mut ctx, &record).unwrap();
        }
        let outcome = batch.finish(&mut ctx).unwrap();

        assert_eq!(flushes.lock().clone(), vec![2, 2, 1]);
        assert_eq!(outcome.accepted, 5);
        assert_eq!(outcome.sent, 0);
        assert_eq!(outcome.stored_offline, 5);
        assert!(outcome.any_offline());
    }

    #[test]
    fn test_empty_run_finishes_cleanly() {
        let flushes = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = context_with(flush_tracking_collector(
            Arc::clone(&flushes),
            SendStatus::Sent,
        ));

        let batch = BatchAccumulator::new(FlushMode::Streamed, 250);
        let outcome = batch.finish(&mut ctx).unwrap();
        assert_eq!(outcome, SendOutcome::default());
    }
}
