//! Physical connection seams and an in-memory connection

use async_trait::async_trait;
use channelgen_core::{DispatchError, DispatchResult};
use channelgen_transport::{Codec, JsonCodec, MessageEnvelope};
use tokio::sync::mpsc;

/// Inbound half of a physical connection, owned by the reader task
#[async_trait]
pub trait MessageSource: Send + 'static {
    /// Next message, or `None` once the peer has gone away
    async fn next_message(&mut self) -> DispatchResult<Option<MessageEnvelope>>;
}

/// Outbound half of a physical connection, owned by the writer task
#[async_trait]
pub trait MessageSink: Send + 'static {
    async fn send_message(&mut self, message: MessageEnvelope) -> DispatchResult<()>;

    /// Release the outbound half
    async fn close(&mut self) -> DispatchResult<()> {
        Ok(())
    }
}

/// Create an in-memory connection
///
/// Returns the two halves a router runs on plus the [`MemoryPeer`] that plays
/// the remote service.
pub fn memory_connection(capacity: usize) -> (MemorySource, MemorySink, MemoryPeer) {
    let capacity = capacity.max(1);
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    (
        MemorySource {
            receiver: inbound_rx,
        },
        MemorySink {
            sender: Some(outbound_tx),
        },
        MemoryPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            codec: JsonCodec::new(),
        },
    )
}

#[derive(Debug)]
pub struct MemorySource {
    receiver: mpsc::Receiver<MessageEnvelope>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next_message(&mut self) -> DispatchResult<Option<MessageEnvelope>> {
        Ok(self.receiver.recv().await)
    }
}

#[derive(Debug)]
pub struct MemorySink {
    sender: Option<mpsc::Sender<MessageEnvelope>>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send_message(&mut self, message: MessageEnvelope) -> DispatchResult<()> {
        let sender = self.sender.as_ref().ok_or(DispatchError::ConnectionClosed)?;
        sender
            .send(message)
            .await
            .map_err(|_| DispatchError::Transport("peer dropped".to_string()))
    }

    async fn close(&mut self) -> DispatchResult<()> {
        self.sender = None;
        Ok(())
    }
}

/// The remote end of an in-memory connection
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: Option<mpsc::Sender<MessageEnvelope>>,
    outbound: mpsc::Receiver<MessageEnvelope>,
    codec: JsonCodec,
}

impl MemoryPeer {
    /// Deliver a message to the router's reader
    pub async fn deliver(&self, message: MessageEnvelope) -> DispatchResult<()> {
        let sender = self.inbound.as_ref().ok_or(DispatchError::ConnectionClosed)?;
        sender
            .send(message)
            .await
            .map_err(|_| DispatchError::ConnectionClosed)
    }

    /// Deliver one wire frame, decoded with the JSON codec
    pub async fn deliver_frame(&self, frame: &str) -> DispatchResult<()> {
        let message = self.codec.decode_frame(frame.as_bytes())?;
        self.deliver(message).await
    }

    /// Next message the router wrote, or `None` once its sink closed
    pub async fn next_sent(&mut self) -> Option<MessageEnvelope> {
        self.outbound.recv().await
    }

    /// Next message the router wrote, encoded as a wire frame
    pub async fn next_sent_frame(&mut self) -> DispatchResult<Option<String>> {
        match self.outbound.recv().await {
            Some(message) => Ok(Some(self.codec.encode_text(&message)?)),
            None => Ok(None),
        }
    }

    /// Drop the inbound half, which ends the router's reader
    pub fn disconnect(&mut self) {
        self.inbound = None;
    }
}
