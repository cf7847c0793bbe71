//! # Writer Configuration

/// Tuning knobs for the asynchronous replay writer.
///
/// The defaults are the shipping values; tests shrink them to provoke edge
/// behavior (tiny queues, short drain bounds).
#[derive(Clone, Debug)]
pub struct WriterConfig {
    /// Maximum queued commands before new writes are dropped.
    pub queue_capacity: usize,
    /// How long the worker sleeps when no wake signal arrives (ms).
    pub wake_timeout_ms: u64,
    /// Pause between queue-depth polls while `close` drains (ms).
    pub close_poll_interval_ms: u64,
    /// Number of drain polls before `close` gives up waiting.
    pub close_poll_attempts: u32,
    /// Bound on waiting for the worker to exit at shutdown (ms).
    pub shutdown_timeout_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            // Replay traffic is a handful of commands per second; a full
            // queue means the disk has effectively stalled.
            queue_capacity: 1024,
            // The periodic wake also covers a missed signal.
            wake_timeout_ms: 100,
            close_poll_interval_ms: 10,
            // 50 polls x 10ms = 500ms worst case for close's drain wait.
            close_poll_attempts: 50,
            shutdown_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = WriterConfig::default();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.wake_timeout_ms, 100);
        assert_eq!(config.close_poll_interval_ms, 10);
        assert_eq!(config.close_poll_attempts, 50);
        assert_eq!(config.shutdown_timeout_ms, 5000);
    }
}
