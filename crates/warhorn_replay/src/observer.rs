//! # Fault Observer
//!
//! The writer is fire-and-forget: no facade call returns an error. Hosts
//! that need to see faults anyway (telemetry overlays, soak tests) inject
//! an observer at construction and receive every fault as it happens.

use crate::error::ReplayFault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives every fault the writer raises.
///
/// Calls arrive from producer threads (dropped writes, shutdown timeout)
/// and from the worker thread (open failures, partial writes), so
/// implementations must be `Send + Sync` and cheap: the producer side runs
/// inside the frame budget.
pub trait FaultObserver: Send + Sync {
    /// Called once per fault, after the matching log event.
    fn on_fault(&self, fault: &ReplayFault);
}

/// Ready-made observer that counts faults by kind.
#[derive(Debug, Default)]
pub struct FaultCounters {
    dropped_writes: AtomicU64,
    open_failures: AtomicU64,
    partial_writes: AtomicU64,
    shutdown_timeouts: AtomicU64,
}

impl FaultCounters {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes refused because the queue was at capacity.
    #[must_use]
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }

    /// Failed attempts to open the target file.
    #[must_use]
    pub fn open_failures(&self) -> u64 {
        self.open_failures.load(Ordering::Relaxed)
    }

    /// Writes that landed fewer bytes than requested.
    #[must_use]
    pub fn partial_writes(&self) -> u64 {
        self.partial_writes.load(Ordering::Relaxed)
    }

    /// Shutdowns that exceeded their bound.
    #[must_use]
    pub fn shutdown_timeouts(&self) -> u64 {
        self.shutdown_timeouts.load(Ordering::Relaxed)
    }
}

impl FaultObserver for FaultCounters {
    fn on_fault(&self, fault: &ReplayFault) {
        match fault {
            ReplayFault::WriteDropped { .. } => {
                self.dropped_writes.fetch_add(1, Ordering::Relaxed);
            }
            ReplayFault::OpenFailed { .. } => {
                self.open_failures.fetch_add(1, Ordering::Relaxed);
            }
            ReplayFault::PartialWrite { .. } => {
                self.partial_writes.fetch_add(1, Ordering::Relaxed);
            }
            ReplayFault::ShutdownTimedOut { .. } => {
                self.shutdown_timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Logs a fault and forwards it to the observer, if one is installed.
pub(crate) fn emit(observer: Option<&Arc<dyn FaultObserver>>, fault: &ReplayFault) {
    match fault {
        ReplayFault::ShutdownTimedOut { .. } => tracing::error!("{}", fault),
        _ => tracing::warn!("{}", fault),
    }
    if let Some(observer) = observer {
        observer.on_fault(fault);
    }
}
