//! # Bounded Command Queue
//!
//! FIFO of [`WriteCommand`]s shared by the producer threads and the worker.
//! Every mutation happens under one lock; the peak-depth and dropped-write
//! counters live under the same lock so they are exact, not sampled.
//!
//! The capacity bound applies to writes only. Control commands (seek,
//! flush, close) arrive at call-site rate and must never be lost: a dropped
//! seek corrupts the stream layout and a dropped close breaks the close
//! protocol.

use crate::command::WriteCommand;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Queue state guarded by one lock.
struct QueueInner {
    commands: VecDeque<WriteCommand>,
    peak_depth: usize,
    dropped_writes: u64,
}

/// Bounded FIFO with a single wake signal for the worker.
pub(crate) struct CommandQueue {
    inner: Mutex<QueueInner>,
    wake: Condvar,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                commands: VecDeque::with_capacity(capacity),
                peak_depth: 0,
                dropped_writes: 0,
            }),
            wake: Condvar::new(),
            capacity,
        }
    }

    /// Enqueues a write command, refusing it at capacity.
    ///
    /// Returns `false` when the command was dropped; the drop is already
    /// counted by then.
    #[must_use]
    pub fn push_write(&self, command: WriteCommand) -> bool {
        let mut inner = self.inner.lock();
        if inner.commands.len() >= self.capacity {
            inner.dropped_writes += 1;
            return false;
        }
        inner.commands.push_back(command);
        let depth = inner.commands.len();
        if depth > inner.peak_depth {
            inner.peak_depth = depth;
        }
        self.wake.notify_one();
        true
    }

    /// Enqueues a control command; never refused.
    pub fn push_control(&self, command: WriteCommand) {
        let mut inner = self.inner.lock();
        inner.commands.push_back(command);
        self.wake.notify_one();
    }

    /// Pops the oldest command, if any.
    pub fn pop(&self) -> Option<WriteCommand> {
        self.inner.lock().commands.pop_front()
    }

    /// Blocks until a command is queued or the timeout passes.
    ///
    /// Returns whether the queue is non-empty, re-checked after the wait so
    /// a command enqueued between two drains is seen even when its
    /// notification fired before the worker was waiting.
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock();
        if inner.commands.is_empty() {
            self.wake.wait_for(&mut inner, timeout);
        }
        !inner.commands.is_empty()
    }

    /// Wakes the worker without enqueueing anything (shutdown path).
    ///
    /// Notifying under the lock means a worker between its exit-flag check
    /// and the wait cannot miss the wakeup.
    pub fn notify_worker(&self) {
        let _inner = self.inner.lock();
        self.wake.notify_all();
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.inner.lock().commands.len()
    }

    /// Whether the queue is currently drained.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().commands.is_empty()
    }

    /// Highest depth observed at write-enqueue time.
    pub fn peak_depth(&self) -> usize {
        self.inner.lock().peak_depth
    }

    /// Writes refused at capacity so far.
    pub fn dropped_writes(&self) -> u64 {
        self.inner.lock().dropped_writes
    }
}
