//! Multiplexed dispatch over one physical connection
//!
//! A [`DispatchRouter`] runs two tasks: the reader owns the inbound half and
//! routes each message to a pipe, the writer drains the outbound queue into
//! the sink. Callers register pipes and consume from them.

use crate::close::{CloseHandle, CloseSignal};
use crate::config::{OverflowPolicy, RouterConfig};
use crate::connection::{MessageSink, MessageSource};
use crate::pipe::{Pipe, PushOutcome};
use crate::registry::PipeRegistry;
use channelgen_core::{DispatchError, DispatchResult, RoutingTable};
use channelgen_transport::MessageEnvelope;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Runtime side of one generated client
pub struct DispatchRouter {
    table: Arc<RoutingTable>,
    registry: Arc<PipeRegistry>,
    config: RouterConfig,
    outbound: mpsc::Sender<MessageEnvelope>,
    close: CloseHandle,
    /// Keys closed through `close_pipe` and not reopened since
    closed_keys: Mutex<HashSet<String>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DispatchRouter {
    /// Spawn the reader and writer tasks for a connection
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S, K>(source: S, sink: K, table: RoutingTable, config: RouterConfig) -> Self
    where
        S: MessageSource,
        K: MessageSink,
    {
        Self::spawn(source, sink, table, config, PipeRegistry::new())
    }

    /// Register `pipes` and then spawn the reader and writer tasks
    ///
    /// Messages for these keys cannot race the registration, since the
    /// reader only starts once every pipe is open.
    pub fn connect<S, K>(
        source: S,
        sink: K,
        table: RoutingTable,
        config: RouterConfig,
        pipes: &[&str],
    ) -> DispatchResult<Self>
    where
        S: MessageSource,
        K: MessageSink,
    {
        let registry = PipeRegistry::new();
        for key in pipes {
            registry.register(Arc::new(Pipe::new(*key, config.pipe_capacity)))?;
        }
        Ok(Self::spawn(source, sink, table, config, registry))
    }

    fn spawn<S, K>(
        source: S,
        sink: K,
        table: RoutingTable,
        config: RouterConfig,
        registry: PipeRegistry,
    ) -> Self
    where
        S: MessageSource,
        K: MessageSink,
    {
        let table = Arc::new(table);
        let registry = Arc::new(registry);
        let close = CloseHandle::new();
        let (outbound, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));

        tracing::info!(channel = %table.channel, "starting dispatch router");

        let reader = tokio::spawn(read_loop(
            source,
            table.clone(),
            registry.clone(),
            config.overflow,
            close.clone(),
        ));
        let writer = tokio::spawn(write_loop(sink, outbound_rx, close.signal()));

        Self {
            table,
            registry,
            config,
            outbound,
            close,
            closed_keys: Mutex::new(HashSet::new()),
            tasks: Mutex::new(vec![reader, writer]),
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &PipeRegistry {
        &self.registry
    }

    /// Fresh opaque stream identifier
    pub fn new_stream_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Register a pipe for `key`
    ///
    /// Register before the first message for the key can arrive: the reader
    /// drops messages that find no pipe.
    pub fn open_pipe(&self, key: &str) -> DispatchResult<Arc<Pipe>> {
        if self.is_closed() {
            return Err(DispatchError::ConnectionClosed);
        }
        let pipe = self
            .registry
            .register(Arc::new(Pipe::new(key, self.config.pipe_capacity)))?;
        self.closed_keys.lock().remove(key);
        Ok(pipe)
    }

    /// Return the live pipe for `key`, registering one if needed
    pub fn ensure_pipe(&self, key: &str) -> DispatchResult<Arc<Pipe>> {
        match self.registry.get(key) {
            Some(pipe) if !pipe.is_closed() => Ok(pipe),
            _ => self.open_pipe(key),
        }
    }

    /// Close and unregister the pipe for `key`
    ///
    /// Later reads for the key fail with `ConnectionClosed` until it is
    /// opened again.
    pub fn close_pipe(&self, key: &str) -> bool {
        let removed = self.registry.remove(key).is_some();
        if removed {
            self.closed_keys.lock().insert(key.to_string());
        }
        removed
    }

    /// Queue a typed message for the writer
    pub async fn send<T: Serialize>(&self, message: &T) -> DispatchResult<()> {
        let envelope = MessageEnvelope::from_typed(message)?;
        self.send_envelope(envelope).await
    }

    /// Queue a raw envelope for the writer
    pub async fn send_envelope(&self, envelope: MessageEnvelope) -> DispatchResult<()> {
        if self.is_closed() {
            return Err(DispatchError::ConnectionClosed);
        }
        self.outbound
            .send(envelope)
            .await
            .map_err(|_| DispatchError::ConnectionClosed)
    }

    /// Pop the next raw message for `key`
    pub async fn consume_raw(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> DispatchResult<MessageEnvelope> {
        if self.registry.is_closed() {
            return Err(DispatchError::ConnectionClosed);
        }
        let Some(pipe) = self.registry.get(key) else {
            if self.closed_keys.lock().contains(key) {
                return Err(DispatchError::ConnectionClosed);
            }
            return Err(DispatchError::PipeNotFound(key.to_string()));
        };
        pipe.recv(timeout.unwrap_or(self.config.consume_timeout))
            .await
    }

    /// Pop the next message for `key` and decode it as `T`
    ///
    /// A message that does not decode fails with `DataBinding`; the message
    /// is consumed either way.
    pub async fn consume<T: DeserializeOwned>(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> DispatchResult<T> {
        let envelope = self.consume_raw(key, timeout).await?;
        envelope
            .body_as::<T>()
            .map_err(|e| DispatchError::DataBinding {
                target: std::any::type_name::<T>().to_string(),
                reason: e.to_string(),
            })
    }

    /// Send a message and wait for its reply
    ///
    /// Channels with a stream-id field get a fresh id stamped into the
    /// outbound message and the reply is read from a pipe keyed by that id.
    /// Without one, the reply is read from the `reply_key` pipe.
    pub async fn request<Req, Resp>(
        &self,
        message: &Req,
        reply_key: &str,
        timeout: Option<Duration>,
    ) -> DispatchResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let mut envelope = MessageEnvelope::from_typed(message)?;

        let Some(stream_field) = self.table.stream_id.as_ref() else {
            self.ensure_pipe(reply_key)?;
            self.send_envelope(envelope).await?;
            return self.consume(reply_key, timeout).await;
        };

        let stream_id = Self::new_stream_id();
        if !envelope.set_field(stream_field, Value::String(stream_id.clone())) {
            return Err(DispatchError::Codec(format!(
                "cannot write stream id at '{}'",
                stream_field
            )));
        }

        self.open_pipe(&stream_id)?;
        let result = match self.send_envelope(envelope).await {
            Ok(()) => self.consume(&stream_id, timeout).await,
            Err(e) => Err(e),
        };
        // Stream ids are never reused, so nothing is remembered for them
        self.registry.remove(&stream_id);
        result
    }

    /// Close the connection and every registered pipe
    pub fn close(&self) {
        if self.close.close() {
            tracing::info!(channel = %self.table.channel, "closing dispatch router");
        }
        self.registry.close_all();
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_closed() || self.registry.is_closed()
    }

    /// Close and wait for both tasks to finish
    pub async fn shutdown(&self) {
        self.close();
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "router task failed");
            }
        }
    }
}

impl Drop for DispatchRouter {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop<S: MessageSource>(
    mut source: S,
    table: Arc<RoutingTable>,
    registry: Arc<PipeRegistry>,
    overflow: OverflowPolicy,
    close: CloseHandle,
) {
    let mut signal = close.signal();
    loop {
        let next = tokio::select! {
            _ = signal.wait() => break,
            next = source.next_message() => next,
        };

        match next {
            Ok(Some(message)) => route(&table, &registry, message, overflow).await,
            Ok(None) => {
                tracing::debug!(channel = %table.channel, "inbound stream ended");
                break;
            }
            Err(e) => {
                tracing::error!(channel = %table.channel, error = %e, "reader failed");
                break;
            }
        }
    }

    // Connection loss closes every pipe so blocked consumers wake up
    close.close();
    registry.close_all();
}

/// Pick the pipe key for an inbound message
fn pipe_key(
    table: &RoutingTable,
    registry: &PipeRegistry,
    message: &MessageEnvelope,
) -> Option<String> {
    if let Some(stream_field) = &table.stream_id
        && let Some(stream_id) = message.dispatch_value(stream_field)
        && registry.contains(stream_id)
    {
        return Some(stream_id.to_string());
    }

    if let Some(key) = &table.dispatch_key
        && let Some(value) = message.dispatch_value(key)
    {
        if !table.knows(value) {
            tracing::debug!(channel = %table.channel, value, "dispatch value not in routing table");
        }
        return Some(value.to_string());
    }

    table.default_pipe.clone()
}

async fn route(
    table: &RoutingTable,
    registry: &PipeRegistry,
    message: MessageEnvelope,
    overflow: OverflowPolicy,
) {
    let Some(key) = pipe_key(table, registry, &message) else {
        tracing::warn!(channel = %table.channel, "dropping message without dispatch value");
        return;
    };

    let Some(pipe) = registry.get(&key) else {
        tracing::warn!(
            channel = %table.channel,
            pipe = %key,
            "no pipe registered, dropping message"
        );
        return;
    };

    match pipe.push(message, overflow).await {
        PushOutcome::Delivered => {
            tracing::trace!(channel = %table.channel, pipe = %key, "message routed");
        }
        PushOutcome::Dropped => {
            tracing::warn!(channel = %table.channel, pipe = %key, "pipe full, dropping message");
        }
        PushOutcome::Closed => {
            tracing::debug!(channel = %table.channel, pipe = %key, "pipe closed, dropping message");
        }
    }
}

async fn write_loop<K: MessageSink>(
    mut sink: K,
    mut outbound: mpsc::Receiver<MessageEnvelope>,
    mut signal: CloseSignal,
) {
    loop {
        let next = tokio::select! {
            _ = signal.wait() => None,
            next = outbound.recv() => next,
        };
        let Some(message) = next else { break };
        if let Err(e) = sink.send_message(message).await {
            tracing::error!(error = %e, "writer failed");
            if let Err(e) = sink.close().await {
                tracing::debug!(error = %e, "sink close failed");
            }
            return;
        }
    }

    // Flush what was queued before the close
    outbound.close();
    while let Ok(message) = outbound.try_recv() {
        if sink.send_message(message).await.is_err() {
            break;
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "sink close failed");
    }
}
