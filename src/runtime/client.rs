//! Dispatching WebSocket client runtime.
//!
//! One socket, one background read loop and one background write loop. All
//! outbound traffic funnels through a single bounded write queue; inbound
//! frames are decoded once and routed to the pipe registered for their
//! correlation id, falling back to the static dispatcher-value routes.
//! Transport failures log, mark the connection inactive and close every
//! registered pipe; they never crash the host process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::ir::{ClientPlan, PipeKey, RPC_PIPE_CAPACITY, STREAM_PIPE_CAPACITY, WRITE_QUEUE_CAPACITY};

use super::pipe::{Pipe, StreamAdapter};
use super::registry::{PipeRegistry, StreamRegistry};

/// How long the read loop waits on a full reply pipe before dropping.
const ROUTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Write-loop poll interval, bounding close-detection latency.
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime dispatch configuration for one client.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Discriminator field inspected on every inbound frame.
    pub dispatcher_key: String,
    /// Correlation-id field inspected first, when configured.
    pub stream_id_key: Option<String>,
    /// Static routes from dispatcher value to registry key.
    pub routes: HashMap<String, String>,
}

impl DispatchConfig {
    /// Build the runtime config from a generation plan.
    ///
    /// Correlation-id routes are resolved dynamically at runtime, so only the
    /// static request-type routes are carried over.
    pub fn from_plan(plan: &ClientPlan) -> Self {
        let mut routes = HashMap::new();
        if let Some(read_loop) = plan.read_loop() {
            for rule in &read_loop.routes {
                if let PipeKey::RequestType(key) = &rule.target {
                    routes.insert(rule.dispatcher_value.clone(), key.clone());
                }
            }
        }
        Self {
            dispatcher_key: plan.dispatcher.key.clone(),
            stream_id_key: plan.dispatcher.stream_id_key.clone(),
            routes,
        }
    }
}

/// Shared state between the client handle and its background loops.
#[derive(Debug)]
struct ClientState {
    dispatcher_key: String,
    stream_id_key: Option<String>,
    routes: HashMap<String, String>,
    write_queue: Pipe<Value>,
    pipes: PipeRegistry,
    streams: StreamRegistry,
    active: AtomicBool,
}

impl ClientState {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark inactive and close every queue. Idempotent.
    fn shutdown(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("shutting down websocket client state");
            self.streams.close_all();
            self.pipes.close_all();
            self.write_queue.close();
        }
    }
}

/// A message-dispatching client over one WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsDispatchClient {
    state: Arc<ClientState>,
}

/// Open a WebSocket connection and start a dispatching client over it.
pub async fn connect(url: &str, config: DispatchConfig) -> Result<WsDispatchClient, ClientError> {
    let (transport, _) =
        tokio_tungstenite::connect_async(url)
            .await
            .map_err(|err| ClientError::Transport {
                cause: err.to_string(),
            })?;
    info!(url, "websocket connection established");
    Ok(WsDispatchClient::new(transport, config))
}

impl WsDispatchClient {
    /// Start a client over an already-established transport.
    ///
    /// Spawns the background read and write loops immediately.
    pub fn new<S>(transport: S, config: DispatchConfig) -> Self
    where
        S: Stream<Item = Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Send
            + Unpin
            + 'static,
    {
        let state = Arc::new(ClientState {
            dispatcher_key: config.dispatcher_key,
            stream_id_key: config.stream_id_key,
            routes: config.routes,
            write_queue: Pipe::new(WRITE_QUEUE_CAPACITY),
            pipes: PipeRegistry::new(),
            streams: StreamRegistry::new(),
            active: AtomicBool::new(true),
        });
        let (ws_tx, ws_rx) = transport.split();
        tokio::spawn(read_loop(ws_rx, Arc::clone(&state)));
        tokio::spawn(write_loop(ws_tx, Arc::clone(&state)));
        Self { state }
    }

    /// Send a request expecting no reply.
    pub async fn fire_and_forget(
        &self,
        payload: Value,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        self.ensure_active()?;
        self.state.write_queue.produce(payload, timeout).await
    }

    /// Send a request and wait for the single reply routed by request type.
    ///
    /// `request_key` is the static registry key the reply routes back to.
    pub async fn request_reply(
        &self,
        request_key: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        self.ensure_active()?;
        // Register before the request leaves, or a fast reply is dropped.
        let pipe = self.state.pipes.register(request_key, RPC_PIPE_CAPACITY);
        self.state.write_queue.produce(payload, timeout).await?;
        pipe.consume(timeout).await
    }

    /// Send a request stamped with a fresh correlation id and wait for the
    /// single reply carrying that id.
    pub async fn request_reply_correlated(
        &self,
        mut payload: Value,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        self.ensure_active()?;
        let id = self.stamp_correlation_id(&mut payload)?;
        let pipe = self.state.pipes.register(&id, RPC_PIPE_CAPACITY);
        self.state.write_queue.produce(payload, timeout).await?;
        let reply = pipe.consume(timeout).await;
        self.state.pipes.deregister(&id);
        reply
    }

    /// Send a request stamped with a fresh correlation id and return a stream
    /// adapter over the replies carrying that id.
    pub async fn open_stream(
        &self,
        mut payload: Value,
        timeout: Duration,
    ) -> Result<StreamAdapter, ClientError> {
        self.ensure_active()?;
        let id = self.stamp_correlation_id(&mut payload)?;
        let pipe = self.state.pipes.register(&id, STREAM_PIPE_CAPACITY);
        self.state.streams.track(Arc::clone(&pipe));
        self.state.write_queue.produce(payload, timeout).await?;
        Ok(StreamAdapter::new(pipe, timeout))
    }

    /// Subscribe to server-push messages routed under `push_key`.
    ///
    /// Registered statically, so pushes arriving before the first `next` call
    /// are buffered up to the pipe capacity.
    pub fn push_stream(&self, push_key: &str, timeout: Duration) -> StreamAdapter {
        let pipe = self.state.pipes.register(push_key, STREAM_PIPE_CAPACITY);
        self.state.streams.track(Arc::clone(&pipe));
        StreamAdapter::new(pipe, timeout)
    }

    /// Close the connection. Idempotent; the write loop sends the close
    /// frame once the queues drain.
    pub fn close(&self) {
        self.state.shutdown();
    }

    /// Whether the connection is still marked active.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    fn ensure_active(&self) -> Result<(), ClientError> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(ClientError::ConnectionClosed)
        }
    }

    fn stamp_correlation_id(&self, payload: &mut Value) -> Result<String, ClientError> {
        let field =
            self.state
                .stream_id_key
                .as_deref()
                .ok_or_else(|| ClientError::PipeProtocol {
                    cause: "no correlation-id field configured".to_string(),
                })?;
        let map = payload
            .as_object_mut()
            .ok_or_else(|| ClientError::DataBinding {
                cause: "request payload is not a JSON object".to_string(),
            })?;
        let id = Uuid::new_v4().to_string();
        map.insert(field.to_string(), Value::String(id.clone()));
        Ok(id)
    }
}

/// Background read loop: decode inbound frames and route them to pipes.
async fn read_loop<R>(mut ws_rx: R, state: Arc<ClientState>)
where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => route_inbound(&state, text.as_str()).await,
            Ok(Message::Close(_)) => {
                debug!("close frame received from server");
                break;
            }
            // Ping/pong and binary frames are not dispatched.
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "websocket read failure");
                break;
            }
        }
    }
    state.shutdown();
}

/// Route one decoded frame: correlation id first, then dispatcher value.
async fn route_inbound(state: &ClientState, raw: &str) {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "discarding unparseable inbound frame");
            return;
        }
    };

    if let Some(id_key) = &state.stream_id_key {
        if let Some(id) = value.get(id_key.as_str()).and_then(Value::as_str) {
            if let Some(pipe) = state.pipes.get(id) {
                deliver(&pipe, value).await;
                return;
            }
        }
    }

    let Some(kind) = value.get(state.dispatcher_key.as_str()).and_then(Value::as_str) else {
        debug!("discarding inbound frame without dispatcher key");
        return;
    };
    match state.routes.get(kind).and_then(|key| state.pipes.get(key)) {
        Some(pipe) => deliver(&pipe, value).await,
        None => debug!(kind, "no route for inbound message"),
    }
}

async fn deliver(pipe: &Pipe<Value>, value: Value) {
    if let Err(err) = pipe.produce(value, ROUTE_TIMEOUT).await {
        warn!(error = %err, "dropping inbound message, reply pipe unavailable");
    }
}

/// Background write loop: drain the write queue onto the socket.
///
/// Polls with a short timeout so a close is noticed promptly; ends by
/// sending the close frame after the queue drains.
async fn write_loop<W>(mut ws_tx: W, state: Arc<ClientState>)
where
    W: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        match state.write_queue.consume(WRITE_POLL_INTERVAL).await {
            Ok(value) => {
                if let Err(err) = ws_tx.send(Message::text(value.to_string())).await {
                    warn!(error = %err, "websocket write failure");
                    state.shutdown();
                    break;
                }
            }
            Err(ClientError::Timeout { .. }) => {
                if !state.is_active() {
                    break;
                }
            }
            // Queue closed and drained.
            Err(_) => break,
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
    let _ = ws_tx.close().await;
}
