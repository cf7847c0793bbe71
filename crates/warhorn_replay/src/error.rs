//! # Replay Fault Types
//!
//! All faults the replay pipeline can raise.
//!
//! None of them are fatal: the writer is fire-and-forget by contract, so
//! faults surface through log events and the
//! [`FaultObserver`](crate::observer::FaultObserver) instead of return
//! values.

use thiserror::Error;

/// Faults raised by the replay writer and its worker thread.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayFault {
    /// The target file could not be opened for writing.
    ///
    /// The command that triggered the open is dropped; the next write
    /// retries the open.
    #[error("failed to open replay target '{path}': {reason}")]
    OpenFailed {
        /// Path the worker tried to open (empty if none was recorded).
        path: String,
        /// Stringified I/O error.
        reason: String,
    },

    /// Fewer bytes reached the file than the command carried.
    ///
    /// Not retried: the byte counter records what actually landed.
    #[error("partial replay write: {written} of {requested} bytes")]
    PartialWrite {
        /// Bytes the command carried.
        requested: usize,
        /// Bytes the file accepted (zero for a failed write).
        written: usize,
    },

    /// The command queue was at capacity and a write was discarded.
    #[error("replay write dropped: queue at capacity {capacity}")]
    WriteDropped {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The worker thread did not exit within the shutdown bound.
    ///
    /// The worker is detached, not killed; its file handle may leak.
    #[error("replay worker did not stop within {timeout_ms} ms")]
    ShutdownTimedOut {
        /// The bound that was exceeded, in milliseconds.
        timeout_ms: u64,
    },
}
