//! Router configuration

use std::time::Duration;

/// Default bounded capacity of each pipe
pub const DEFAULT_PIPE_CAPACITY: usize = 1000;

/// Default time a consumer waits for a message
pub const DEFAULT_CONSUME_TIMEOUT: Duration = Duration::from_secs(5);

/// What the reader does when a pipe is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the message and log; the reader never blocks on a slow consumer
    #[default]
    Drop,
    /// Wait up to the window for space, then drop
    ///
    /// Every other stream on the connection stalls while the reader waits.
    Wait(Duration),
}

/// Configuration for a [`crate::DispatchRouter`]
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Capacity of each pipe (clamped to at least 1)
    pub pipe_capacity: usize,
    /// Consume timeout used when a caller passes none
    pub consume_timeout: Duration,
    /// Full-pipe behaviour of the reader
    pub overflow: OverflowPolicy,
    /// Capacity of the outbound queue drained by the writer
    pub outbound_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            consume_timeout: DEFAULT_CONSUME_TIMEOUT,
            overflow: OverflowPolicy::Drop,
            outbound_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity;
        self
    }

    pub fn with_consume_timeout(mut self, timeout: Duration) -> Self {
        self.consume_timeout = timeout;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }
}

#[cfg(test)]
#[path = "config/config_tests.rs"]
mod config_tests;
