//! Bounded per-stream queue between the reader task and one consumer

use crate::close::CloseHandle;
use crate::config::OverflowPolicy;
use channelgen_core::{DispatchError, DispatchResult, PipeState};
use channelgen_transport::MessageEnvelope;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// Result of handing a message to a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The pipe was full and the overflow policy gave up
    Dropped,
    /// The pipe no longer accepts input
    Closed,
}

/// One logical message stream
///
/// The reader task pushes, a consumer pops. Messages pushed in order are
/// popped in the same order.
#[derive(Debug)]
pub struct Pipe {
    key: String,
    state: AtomicU8,
    sender: mpsc::Sender<MessageEnvelope>,
    receiver: Mutex<mpsc::Receiver<MessageEnvelope>>,
    close: CloseHandle,
}

impl Pipe {
    /// Create a pipe in the `Created` state
    pub fn new(key: impl Into<String>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            key: key.into(),
            state: AtomicU8::new(PipeState::Created.as_u8()),
            sender,
            receiver: Mutex::new(receiver),
            close: CloseHandle::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> PipeState {
        PipeState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Attempt a state transition, returning whether it happened
    fn transition(&self, target: PipeState) -> bool {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if !PipeState::from_u8(current).can_transition_to(target) {
                return false;
            }
            match self.state.compare_exchange(
                current,
                target.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Make the pipe visible to the reader
    pub fn open(&self) -> bool {
        self.transition(PipeState::Open)
    }

    /// Close the pipe and release any blocked consumer
    ///
    /// Returns `false` if the pipe was already closed.
    pub fn close(&self) -> bool {
        let closed = self.transition(PipeState::Closed);
        if closed {
            tracing::debug!(pipe = %self.key, "pipe closed");
        }
        self.close.close();
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Hand a message to the pipe according to the overflow policy
    pub async fn push(&self, message: MessageEnvelope, overflow: OverflowPolicy) -> PushOutcome {
        if !self.state().accepts_input() {
            return PushOutcome::Closed;
        }

        match overflow {
            OverflowPolicy::Drop => match self.sender.try_send(message) {
                Ok(()) => PushOutcome::Delivered,
                Err(mpsc::error::TrySendError::Full(_)) => PushOutcome::Dropped,
                Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::Closed,
            },
            OverflowPolicy::Wait(window) => {
                let mut signal = self.close.signal();
                tokio::select! {
                    _ = signal.wait() => PushOutcome::Closed,
                    sent = tokio::time::timeout(window, self.sender.send(message)) => match sent {
                        Ok(Ok(())) => PushOutcome::Delivered,
                        Ok(Err(_)) => PushOutcome::Closed,
                        Err(_) => PushOutcome::Dropped,
                    },
                }
            }
        }
    }

    /// Pop the next message, waiting at most `timeout`
    ///
    /// Fails with `ConnectionClosed` immediately once the pipe is closed, and
    /// with `Timeout` if nothing arrives in time. A timeout leaves the pipe
    /// state untouched.
    pub async fn recv(&self, timeout: Duration) -> DispatchResult<MessageEnvelope> {
        if self.is_closed() {
            return Err(DispatchError::ConnectionClosed);
        }

        let mut signal = self.close.signal();
        let read = async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        };

        tokio::select! {
            biased;
            _ = signal.wait() => Err(DispatchError::ConnectionClosed),
            result = tokio::time::timeout(timeout, read) => match result {
                Ok(Some(message)) => Ok(message),
                Ok(None) => Err(DispatchError::ConnectionClosed),
                Err(_) => Err(DispatchError::Timeout {
                    key: self.key.clone(),
                    after: timeout,
                }),
            },
        }
    }

    /// Stop intake and return whatever is buffered, then close
    ///
    /// This is the timeout-free read: it never waits for new messages.
    pub async fn drain(&self) -> DispatchResult<Vec<MessageEnvelope>> {
        if !self.transition(PipeState::Draining) {
            return Err(DispatchError::ConnectionClosed);
        }

        // Wake consumers blocked on recv so the receiver lock frees up
        self.close.close();

        let mut buffered = Vec::new();
        {
            let mut receiver = self.receiver.lock().await;
            while let Ok(message) = receiver.try_recv() {
                buffered.push(message);
            }
        }

        self.transition(PipeState::Closed);
        tracing::debug!(pipe = %self.key, count = buffered.len(), "pipe drained");
        Ok(buffered)
    }
}

#[cfg(test)]
#[path = "pipe/pipe_tests.rs"]
mod pipe_tests;
