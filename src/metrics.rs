//! Per-writer accounting exposed for diagnostics.

use std::time::Duration;

/// Snapshot of one tablet writer's activity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct WriterMetricsSnapshot {
    /// Rows absorbed by `write`.
    pub rows_written: u64,
    /// Segments sealed, across explicit flushes, rollovers and `finish`.
    pub segments_sealed: u64,
    /// Explicit `flush` calls that completed.
    pub flush_count: u64,
    /// Bytes of every sealed segment.
    pub bytes_persisted: u64,
    /// Total time (microseconds) spent sealing segments.
    pub seal_us: u128,
}

#[derive(Debug, Default)]
pub(crate) struct WriterMetrics {
    snapshot: WriterMetricsSnapshot,
}

impl WriterMetrics {
    pub(crate) fn record_rows(&mut self, rows: u64) {
        self.snapshot.rows_written += rows;
    }

    pub(crate) fn record_seal(&mut self, bytes: u64, elapsed: Duration) {
        self.snapshot.segments_sealed += 1;
        self.snapshot.bytes_persisted += bytes;
        self.snapshot.seal_us += elapsed.as_micros();
    }

    pub(crate) fn record_flush(&mut self) {
        self.snapshot.flush_count += 1;
    }

    pub(crate) fn snapshot(&self) -> WriterMetricsSnapshot {
        self.snapshot.clone()
    }
}
