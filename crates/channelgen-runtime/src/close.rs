//! Cooperative close signalling for pipes and connections

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Handle that closes a pipe or a whole connection
///
/// Cloning shares the underlying flag; closing through any clone wakes every
/// outstanding [`CloseSignal`].
#[derive(Clone, Debug)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl CloseHandle {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Mark closed and wake waiters
    ///
    /// Returns `true` only for the call that performed the close.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.sender.send(());
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get a signal that completes once this handle is closed
    pub fn signal(&self) -> CloseSignal {
        CloseSignal {
            closed: self.closed.clone(),
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CloseHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Awaitable view of a [`CloseHandle`], one per waiting task
pub struct CloseSignal {
    closed: Arc<AtomicBool>,
    receiver: broadcast::Receiver<()>,
}

impl CloseSignal {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until closed
    ///
    /// Returns immediately if the handle was closed before the call. Safe to
    /// use as a `tokio::select!` branch.
    pub async fn wait(&mut self) {
        if self.is_closed() {
            return;
        }
        let _ = self.receiver.recv().await;
    }
}

impl Clone for CloseSignal {
    fn clone(&self) -> Self {
        Self {
            closed: self.closed.clone(),
            receiver: self.receiver.resubscribe(),
        }
    }
}

#[cfg(test)]
#[path = "close/close_tests.rs"]
mod close_tests;
