//! # Writer Statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of one writer's lifetime counters.
///
/// `total_writes` counts executed write attempts (partial ones included);
/// `dropped_writes` counts writes refused at the queue. A given write lands
/// in exactly one of the two.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Write commands executed by the worker.
    pub total_writes: u64,
    /// Bytes the file actually accepted, across all writes.
    pub total_bytes_written: u64,
    /// Highest queue depth observed at write-enqueue time.
    pub peak_queue_depth: usize,
    /// Writes discarded because the queue was at capacity.
    pub dropped_writes: u64,
}

/// Executed-I/O counters. Incremented only by the worker thread; read by
/// anyone through [`ReplayWriter::stats`](crate::ReplayWriter::stats).
#[derive(Debug, Default)]
pub(crate) struct IoCounters {
    pub total_writes: AtomicU64,
    pub total_bytes_written: AtomicU64,
}

impl IoCounters {
    /// Records one executed write attempt and the bytes it landed.
    pub fn record_write(&self, bytes: u64) {
        self.total_writes.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }
}
