//! Byte and chunk counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters for one driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Bytes returned by the source.
    pub bytes_read: u64,
    /// Bytes consumed by the sink.
    pub bytes_written: u64,
    /// Non-empty chunks read from the source.
    pub chunks: u64,
    /// `accept` calls that consumed fewer bytes than offered.
    pub backpressure_retries: u64,
}

/// Live counters a running driver updates and other threads observe.
///
/// Share it with [`Arc`](std::sync::Arc) and read it with
/// [`snapshot()`](PipelineStats::snapshot).
#[derive(Debug, Default)]
pub struct PipelineStats {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    chunks: AtomicU64,
    backpressure_retries: AtomicU64,
}

impl PipelineStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self, bytes: usize) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
        self.chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_backpressure(&self) {
        self.backpressure_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    ///
    /// Counters are read one at a time, so a snapshot taken while a driver
    /// is running may mix values from adjacent chunks.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            chunks: self.chunks.load(Ordering::Relaxed),
            backpressure_retries: self.backpressure_retries.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        assert_eq!(PipelineStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_accumulate() {
        let stats = PipelineStats::new();
        stats.record_read(10);
        stats.record_read(5);
        stats.record_written(12);
        stats.record_backpressure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.bytes_read, 15);
        assert_eq!(snapshot.chunks, 2);
        assert_eq!(snapshot.bytes_written, 12);
        assert_eq!(snapshot.backpressure_retries, 1);
    }
}
