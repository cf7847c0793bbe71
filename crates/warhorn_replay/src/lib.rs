//! # WARHORN Replay Writer
//!
//! **Asynchronous command-queue file writer for replay recording**
//!
//! The game thread has a hard per-frame budget. A single buffered write
//! plus flush can stall it for milliseconds, and replay recording issues
//! dozens of writes per second. This crate decouples the two: producers
//! enqueue ordered file operations in microseconds, and one dedicated
//! worker thread performs the actual blocking I/O.
//!
//! ## Architecture
//!
//! ```text
//!   Game thread ──┐
//!   Any thread  ──┼──> [Bounded Command Queue] ──> [Worker Thread] ──> Disk
//!                 ┘      (FIFO, drop-newest         (sole owner of
//!                         at capacity)               the file handle)
//! ```
//!
//! ## Design Principles
//!
//! 1. **Producers never block** - facade calls enqueue and return; the one
//!    bounded wait is `close`'s drain poll
//! 2. **One thread owns the file** - open, write, seek, flush and close all
//!    execute on the worker, in enqueue order
//! 3. **Loss is observable, never silent** - saturation drops the newest
//!    write and says so through counters, logs and the fault observer
//! 4. **Shutdown is bounded** - a stuck worker is reported and detached,
//!    not joined forever and not killed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warhorn_replay::{ReplayWriter, WriterConfig};
//!
//! let writer = ReplayWriter::new(WriterConfig::default());
//! writer.open("replays/last_match.rep");
//! writer.write(&header_bytes);
//! writer.write(&frame_bytes);
//! writer.flush();
//! writer.close();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod config;
pub mod error;
pub mod observer;
mod queue;
pub mod stats;
pub mod worker;
pub mod writer;

pub use command::WriteCommand;
pub use config::WriterConfig;
pub use error::ReplayFault;
pub use observer::{FaultCounters, FaultObserver};
pub use stats::WriterStats;
pub use worker::WorkerState;
pub use writer::ReplayWriter;
