//! # Replay Commands
//!
//! The vocabulary of deferred file operations. A command owns everything it
//! needs to execute, so the caller's buffer can be reused the moment the
//! enqueueing call returns.

use std::fmt;
use std::io::SeekFrom;

/// One deferred file operation.
///
/// Commands are created by the [`ReplayWriter`](crate::ReplayWriter)
/// facade, carried through the bounded queue in FIFO order, and executed at
/// most once by the worker thread. A command destroyed without executing
/// (shutdown raced it, or its write was dropped) releases its payload with
/// it.
#[derive(Clone, PartialEq, Eq)]
pub enum WriteCommand {
    /// Append an owned copy of the caller's bytes to the replay stream.
    WriteData(Vec<u8>),
    /// Reposition the file cursor.
    Seek(SeekFrom),
    /// Push buffered bytes to the operating system.
    Flush,
    /// Flush and close the current file handle.
    Close,
}

impl fmt::Debug for WriteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads can be large; log their length, not their bytes.
        match self {
            Self::WriteData(bytes) => f
                .debug_struct("WriteData")
                .field("len", &bytes.len())
                .finish(),
            Self::Seek(pos) => f.debug_tuple("Seek").field(pos).finish(),
            Self::Flush => f.write_str("Flush"),
            Self::Close => f.write_str("Close"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_prints_payload_length_not_bytes() {
        let command = WriteCommand::WriteData(vec![0xAB; 512]);
        let rendered = format!("{command:?}");
        assert!(rendered.contains("len: 512"));
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn test_debug_for_control_commands() {
        assert_eq!(format!("{:?}", WriteCommand::Flush), "Flush");
        assert_eq!(format!("{:?}", WriteCommand::Close), "Close");
        let seek = WriteCommand::Seek(SeekFrom::Start(16));
        assert_eq!(format!("{seek:?}"), "Seek(Start(16))");
    }
}
