//! Shared pipe registry keyed by dispatch value or stream id

use crate::pipe::Pipe;
use channelgen_core::{DispatchError, DispatchResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Map from pipe key to pipe, guarded by a single lock
///
/// Callers insert, the reader looks up, and close removes. The lock is only
/// ever taken for map operations and never held across an `.await`.
#[derive(Debug, Default)]
pub struct PipeRegistry {
    pipes: Mutex<HashMap<String, Arc<Pipe>>>,
    closed: AtomicBool,
}

impl PipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and open a pipe
    ///
    /// Fails with `DuplicatePipe` if a live pipe already uses the key, and
    /// with `ConnectionClosed` once the registry has been closed.
    pub fn register(&self, pipe: Arc<Pipe>) -> DispatchResult<Arc<Pipe>> {
        if self.is_closed() {
            return Err(DispatchError::ConnectionClosed);
        }

        let mut pipes = self.pipes.lock();
        if let Some(existing) = pipes.get(pipe.key())
            && !existing.is_closed()
        {
            return Err(DispatchError::DuplicatePipe(pipe.key().to_string()));
        }

        pipe.open();
        pipes.insert(pipe.key().to_string(), pipe.clone());
        tracing::debug!(pipe = %pipe.key(), "pipe registered");
        Ok(pipe)
    }

    pub fn get(&self, key: &str) -> Option<Arc<Pipe>> {
        self.pipes.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pipes.lock().contains_key(key)
    }

    /// Unregister a pipe and close it
    pub fn remove(&self, key: &str) -> Option<Arc<Pipe>> {
        let removed = self.pipes.lock().remove(key);
        if let Some(pipe) = &removed {
            pipe.close();
        }
        removed
    }

    /// Close every registered pipe and refuse new registrations
    ///
    /// Returns the number of pipes that were closed.
    pub fn close_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let pipes: Vec<Arc<Pipe>> = self.pipes.lock().drain().map(|(_, pipe)| pipe).collect();
        for pipe in &pipes {
            pipe.close();
        }
        if !pipes.is_empty() {
            tracing::debug!(count = pipes.len(), "closed all pipes");
        }
        pipes.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.pipes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.lock().is_empty()
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pipes.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}
