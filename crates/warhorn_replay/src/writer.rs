//! # Replay Writer Facade
//!
//! The producer-facing surface. Every call here either enqueues a command
//! or reads metadata; the worker thread does all the I/O. The one bounded
//! wait a producer can hit is `close`'s drain poll.

use crate::command::WriteCommand;
use crate::config::WriterConfig;
use crate::error::ReplayFault;
use crate::observer::{emit, FaultObserver};
use crate::queue::CommandQueue;
use crate::stats::{IoCounters, WriterStats};
use crate::worker::{ExitLatch, Worker, WorkerState};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Asynchronous, fire-and-forget replay file writer.
///
/// Construction spawns the worker thread immediately, before any target
/// file is known. `open` records where bytes should go; the underlying
/// handle opens lazily when the first write executes. Dropping the writer
/// runs the shutdown protocol with the configured bound.
///
/// One instance records one logical replay stream; the facade itself is
/// safe to share across producer threads, and commands execute in enqueue
/// order regardless of which thread enqueued them.
pub struct ReplayWriter {
    config: WriterConfig,
    queue: Arc<CommandQueue>,
    target: Arc<Mutex<Option<PathBuf>>>,
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker_state: Arc<AtomicU8>,
    counters: Arc<IoCounters>,
    exit_latch: Arc<ExitLatch>,
    observer: Option<Arc<dyn FaultObserver>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl ReplayWriter {
    /// Starts a writer (and its worker thread) with no fault observer.
    #[must_use]
    pub fn new(config: WriterConfig) -> Self {
        Self::start(config, None)
    }

    /// Starts a writer whose faults are forwarded to `observer`.
    #[must_use]
    pub fn with_observer(config: WriterConfig, observer: Arc<dyn FaultObserver>) -> Self {
        Self::start(config, Some(observer))
    }

    fn start(config: WriterConfig, observer: Option<Arc<dyn FaultObserver>>) -> Self {
        let queue = Arc::new(CommandQueue::new(config.queue_capacity));
        let target = Arc::new(Mutex::new(None));
        let shutdown = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let worker_state = Arc::new(AtomicU8::new(WorkerState::Waiting as u8));
        let counters = Arc::new(IoCounters::default());
        let exit_latch = Arc::new(ExitLatch::new());

        let worker = Worker {
            queue: Arc::clone(&queue),
            target: Arc::clone(&target),
            shutdown: Arc::clone(&shutdown),
            running: Arc::clone(&running),
            state: Arc::clone(&worker_state),
            counters: Arc::clone(&counters),
            exit_latch: Arc::clone(&exit_latch),
            observer: observer.clone(),
            wake_timeout: Duration::from_millis(config.wake_timeout_ms),
            file: None,
        };
        let worker_handle = thread::spawn(move || worker.run());

        Self {
            config,
            queue,
            target,
            shutdown,
            running,
            worker_state,
            counters,
            exit_latch,
            observer,
            worker_handle: Some(worker_handle),
        }
    }

    /// Records `path` as the replay target.
    ///
    /// Issues no syscalls and cannot fail here: a bad path surfaces later,
    /// asynchronously, when the worker attempts the open. If a target is
    /// already recorded, the full [`close`](Self::close) protocol runs
    /// first.
    pub fn open(&self, path: impl AsRef<Path>) {
        if self.target.lock().is_some() {
            self.close();
        }
        *self.target.lock() = Some(path.as_ref().to_path_buf());
    }

    /// Queues an owned copy of `data` for appending to the stream.
    ///
    /// Empty buffers are rejected without enqueueing. At queue capacity the
    /// write is dropped, counted, logged and reported to the observer; the
    /// call never blocks either way.
    pub fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if !self.queue.push_write(WriteCommand::WriteData(data.to_vec())) {
            emit(
                self.observer.as_ref(),
                &ReplayFault::WriteDropped {
                    capacity: self.config.queue_capacity,
                },
            );
        }
    }

    /// Queues a cursor reposition.
    pub fn seek(&self, pos: SeekFrom) {
        self.queue.push_control(WriteCommand::Seek(pos));
    }

    /// Queues a push of buffered bytes to the OS.
    ///
    /// Asynchronous: the actual flush happens on the worker thread.
    pub fn flush(&self) {
        self.queue.push_control(WriteCommand::Flush);
    }

    /// Queues a close of the current target, then waits (bounded) for the
    /// queue to drain before clearing the recorded target.
    ///
    /// Best effort: if the bound elapses the close stays queued and
    /// completes whenever the worker next drains. Returns immediately when
    /// no target is recorded.
    pub fn close(&self) {
        if self.target.lock().is_none() {
            return;
        }
        self.queue.push_control(WriteCommand::Close);
        let pause = Duration::from_millis(self.config.close_poll_interval_ms);
        for _ in 0..self.config.close_poll_attempts {
            if self.queue.is_empty() {
                break;
            }
            thread::sleep(pause);
        }
        *self.target.lock() = None;
    }

    /// Commands queued but not yet executed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Whether the worker thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current worker state tag.
    #[must_use]
    pub fn worker_state(&self) -> WorkerState {
        WorkerState::from_tag(self.worker_state.load(Ordering::Relaxed))
    }

    /// Snapshot of the lifetime counters.
    #[must_use]
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            total_writes: self.counters.total_writes.load(Ordering::Relaxed),
            total_bytes_written: self.counters.total_bytes_written.load(Ordering::Relaxed),
            peak_queue_depth: self.queue.peak_depth(),
            dropped_writes: self.queue.dropped_writes(),
        }
    }

    /// Stops the worker, waiting up to `timeout` for it to exit.
    ///
    /// The worker finishes a final full drain before exiting, so commands
    /// enqueued before this call are not lost in a clean shutdown. Returns
    /// whether the worker stopped in time; on timeout the fault is reported
    /// and the thread is detached, never killed. Idempotent.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.worker_handle.take() else {
            return true;
        };
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.notify_worker();
        let clean = self.exit_latch.wait_timeout(timeout);
        if clean {
            let _ = handle.join();
        } else {
            emit(
                self.observer.as_ref(),
                &ReplayFault::ShutdownTimedOut {
                    timeout_ms: timeout.as_millis() as u64,
                },
            );
            // Detached, not killed; a stuck worker is a reported fault.
            drop(handle);
        }
        let stats = self.stats();
        tracing::info!(
            "replay writer shutdown: {} writes, {} bytes, peak queue {}, {} dropped",
            stats.total_writes,
            stats.total_bytes_written,
            stats.peak_queue_depth,
            stats.dropped_writes
        );
        clean
    }
}

impl Drop for ReplayWriter {
    fn drop(&mut self) {
        self.shutdown(Duration::from_millis(self.config.shutdown_timeout_ms));
    }
}
