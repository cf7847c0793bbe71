//! # Worker Thread
//!
//! The single thread that performs replay I/O. It owns the file handle
//! outright: no other code opens, writes, seeks, or closes the replay
//! file. Command failures are reported and skipped; nothing a command does
//! can abort the loop.

use crate::command::WriteCommand;
use crate::error::ReplayFault;
use crate::observer::{emit, FaultObserver};
use crate::queue::CommandQueue;
use crate::stats::IoCounters;
use parking_lot::{Condvar, Mutex};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Observable worker states, published as an atomic tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Parked on the wake signal (bounded wait).
    Waiting = 0,
    /// Executing queued commands.
    Draining = 1,
    /// Exited; the writer is no longer running.
    Exited = 2,
}

impl WorkerState {
    pub(crate) fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Waiting,
            1 => Self::Draining,
            _ => Self::Exited,
        }
    }
}

/// Latch the worker trips on its way out; `shutdown` waits on it with a
/// bound instead of joining an unresponsive thread.
pub(crate) struct ExitLatch {
    done: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ExitLatch {
    pub fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Trips the latch. Store and notify happen under the mutex so a waiter
    /// between its flag check and the wait cannot miss the signal.
    pub fn signal(&self) {
        let _guard = self.mutex.lock();
        self.done.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Waits for the latch with a bound. Returns whether it tripped in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.done.load(Ordering::Acquire) {
            return true;
        }
        let mut guard = self.mutex.lock();
        if self.done.load(Ordering::Acquire) {
            return true;
        }
        self.condvar.wait_for(&mut guard, timeout);
        self.done.load(Ordering::Acquire)
    }
}

/// The worker's half of the shared state, plus the one file handle.
pub(crate) struct Worker {
    pub queue: Arc<CommandQueue>,
    pub target: Arc<Mutex<Option<PathBuf>>>,
    pub shutdown: Arc<AtomicBool>,
    pub running: Arc<AtomicBool>,
    pub state: Arc<AtomicU8>,
    pub counters: Arc<IoCounters>,
    pub exit_latch: Arc<ExitLatch>,
    pub observer: Option<Arc<dyn FaultObserver>>,
    pub wake_timeout: Duration,
    pub file: Option<BufWriter<File>>,
}

impl Worker {
    /// Runs until shutdown is requested, then drains and exits.
    pub fn run(mut self) {
        tracing::debug!("replay worker started");
        while !self.shutdown.load(Ordering::Relaxed) {
            self.state.store(WorkerState::Waiting as u8, Ordering::Relaxed);
            if self.queue.wait_for_work(self.wake_timeout) {
                self.state.store(WorkerState::Draining as u8, Ordering::Relaxed);
                self.drain();
            }
        }

        // Final drain: a command enqueued before shutdown is never lost.
        self.drain();
        if let Some(file) = self.file.take() {
            Self::close_handle(file);
        }
        tracing::debug!(
            "replay worker exiting: {} writes executed",
            self.counters.total_writes.load(Ordering::Relaxed)
        );
        self.state.store(WorkerState::Exited as u8, Ordering::Relaxed);
        self.running.store(false, Ordering::Release);
        self.exit_latch.signal();
    }

    /// Pops and executes commands until the queue is empty.
    ///
    /// The queue lock is held per pop, never across the I/O itself.
    fn drain(&mut self) {
        while let Some(command) = self.queue.pop() {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: WriteCommand) {
        match command {
            WriteCommand::WriteData(bytes) => self.write_data(&bytes),
            WriteCommand::Seek(pos) => self.seek(pos),
            WriteCommand::Flush => self.flush(),
            WriteCommand::Close => self.close(),
        }
    }

    fn write_data(&mut self, bytes: &[u8]) {
        if self.file.is_none() && !self.open_target() {
            // Command dropped; the next write retries the open.
            return;
        }
        let Some(writer) = self.file.as_mut() else {
            return;
        };
        let requested = bytes.len();
        // A failed write counts as zero bytes landed, same as a short one.
        let written = writer.write(bytes).unwrap_or(0);
        if written < requested {
            emit(
                self.observer.as_ref(),
                &ReplayFault::PartialWrite { requested, written },
            );
        }
        self.counters.record_write(written as u64);
    }

    /// Lazily opens (create/truncate) the recorded target.
    fn open_target(&mut self) -> bool {
        let target = self.target.lock().clone();
        let Some(path) = target else {
            emit(
                self.observer.as_ref(),
                &ReplayFault::OpenFailed {
                    path: String::new(),
                    reason: "no target file recorded".to_string(),
                },
            );
            return false;
        };
        match OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)
        {
            Ok(file) => {
                tracing::debug!("replay target opened: {}", path.display());
                self.file = Some(BufWriter::new(file));
                true
            }
            Err(error) => {
                emit(
                    self.observer.as_ref(),
                    &ReplayFault::OpenFailed {
                        path: path.display().to_string(),
                        reason: error.to_string(),
                    },
                );
                false
            }
        }
    }

    fn seek(&mut self, pos: SeekFrom) {
        let Some(writer) = self.file.as_mut() else {
            return;
        };
        // BufWriter flushes its buffer before moving the cursor.
        if let Err(error) = writer.seek(pos) {
            tracing::warn!("replay seek failed: {}", error);
        }
    }

    fn flush(&mut self) {
        let Some(writer) = self.file.as_mut() else {
            return;
        };
        if let Err(error) = writer.flush() {
            tracing::warn!("replay flush failed: {}", error);
        }
    }

    fn close(&mut self) {
        if let Some(file) = self.file.take() {
            Self::close_handle(file);
        }
    }

    fn close_handle(mut file: BufWriter<File>) {
        if let Err(error) = file.flush() {
            tracing::warn!("replay flush on close failed: {}", error);
        }
        // Dropping the BufWriter closes the underlying handle.
    }
}
