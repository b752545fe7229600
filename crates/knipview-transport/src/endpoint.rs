//! RPC endpoint: outgoing calls, served calls and connection lifecycle

use crate::frame::{Frame, FrameCodec, JsonCodec};
use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use knipview_config::logging::call_span;
use knipview_config::RpcConfig;
use knipview_foundation::{ErrorEnvelope, KnipviewError, KnipviewResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, warn, Instrument};

/// Default per-call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(6 * 60);

type PendingCalls = Arc<Mutex<HashMap<String, oneshot::Sender<KnipviewResult<Value>>>>>;

/// Invoked with the method name when an outgoing call times out
pub type TimeoutCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Functions served to the peer
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    /// Serve one call; the error is marshalled into the reply envelope
    async fn handle(&self, method: &str, args: Vec<Value>) -> KnipviewResult<Value>;
}

/// Serves nothing; every call is rejected as an unknown method
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFunctions;

#[async_trait]
impl RpcHandler for NoFunctions {
    async fn handle(&self, method: &str, _args: Vec<Value>) -> KnipviewResult<Value> {
        Err(KnipviewError::invalid_request(format!(
            "Unknown method: {}",
            method
        )))
    }
}

/// Endpoint behavior
#[derive(Clone)]
pub struct RpcOptions {
    /// How long an outgoing call waits for its reply
    pub timeout: Duration,
    pub on_timeout: Option<TimeoutCallback>,
    pub codec: Arc<dyn FrameCodec>,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
            on_timeout: None,
            codec: Arc::new(JsonCodec),
        }
    }
}

impl RpcOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn on_timeout(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Arc::new(callback));
        self
    }

    pub fn with_codec(mut self, codec: impl FrameCodec) -> Self {
        self.codec = Arc::new(codec);
        self
    }
}

impl From<&RpcConfig> for RpcOptions {
    fn from(config: &RpcConfig) -> Self {
        RpcOptions::default().with_timeout(Duration::from_millis(config.timeout_ms))
    }
}

impl fmt::Debug for RpcOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcOptions")
            .field("timeout", &self.timeout)
            .field("on_timeout", &self.on_timeout.is_some())
            .finish_non_exhaustive()
    }
}

/// One side of an RPC connection
///
/// Cheap to clone; all clones share the same connection.
#[derive(Clone)]
pub struct RpcEndpoint {
    inner: Arc<Inner>,
}

struct Inner {
    outgoing: mpsc::UnboundedSender<String>,
    pending: PendingCalls,
    next_id: AtomicU64,
    closed: AtomicBool,
    closed_signal: watch::Sender<bool>,
    options: RpcOptions,
}

impl RpcEndpoint {
    /// Bind an endpoint to a duplex channel and start serving `handler`
    ///
    /// Spawns a reader task and a writer task. The endpoint closes when the
    /// incoming stream ends, the sink fails, or [`RpcEndpoint::close`] is
    /// called.
    pub fn attach<S, K>(
        handler: Arc<dyn RpcHandler>,
        options: RpcOptions,
        incoming: S,
        outgoing: K,
    ) -> Self
    where
        S: Stream<Item = String> + Send + 'static,
        K: Sink<String> + Send + 'static,
        K::Error: fmt::Display + Send,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let (closed_signal, _) = watch::channel(false);

        let inner = Arc::new(Inner {
            outgoing: tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            closed_signal,
            options,
        });

        tokio::spawn(write_loop(Arc::clone(&inner), rx, outgoing));
        tokio::spawn(read_loop(Arc::clone(&inner), handler, incoming));

        Self { inner }
    }

    /// Invoke `method` on the peer and wait for its reply
    pub async fn call(&self, method: &str, args: Vec<Value>) -> KnipviewResult<Value> {
        let id = format!("req_{}", self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.inner.pending.lock().await;
            if self.is_closed() {
                return Err(KnipviewError::connection("endpoint is closed"));
            }
            pending.insert(id.clone(), tx);
        }

        if let Err(e) = self.send_frame(&Frame::request(id.clone(), method, args)) {
            self.inner.pending.lock().await.remove(&id);
            return Err(e);
        }

        debug!(call_id = %id, method = %method, "Sent call");

        match timeout(self.inner.options.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(KnipviewError::connection("connection closed")),
            Err(_) => {
                self.inner.pending.lock().await.remove(&id);
                let timeout_ms = self.inner.options.timeout.as_millis() as u64;
                warn!(call_id = %id, method = %method, timeout_ms, "Call timed out");
                if let Some(callback) = &self.inner.options.on_timeout {
                    callback(method);
                }
                Err(KnipviewError::transport_timeout(method, timeout_ms))
            }
        }
    }

    /// Invoke `method` and deserialize its result
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> KnipviewResult<T> {
        let value = self.call(method, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fire-and-forget call; the peer sends no reply
    pub fn notify(&self, method: &str, args: Vec<Value>) -> KnipviewResult<()> {
        if self.is_closed() {
            return Err(KnipviewError::connection("endpoint is closed"));
        }
        self.send_frame(&Frame::notification(method, args))
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of calls still waiting for a reply
    pub async fn pending_calls(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Shut the endpoint down, rejecting every pending call
    pub async fn close(&self) {
        self.inner.shutdown("endpoint closed").await;
    }

    /// Resolves once the endpoint is closed, for whatever reason
    pub async fn closed(&self) {
        let mut signal = self.inner.closed_signal.subscribe();
        if *signal.borrow_and_update() {
            return;
        }
        let _ = signal.changed().await;
    }

    fn send_frame(&self, frame: &Frame) -> KnipviewResult<()> {
        let text = self.inner.options.codec.serialize(frame)?;
        self.inner
            .outgoing
            .send(text)
            .map_err(|_| KnipviewError::connection("connection closed"))
    }
}

impl fmt::Debug for RpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("closed", &self.is_closed())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Inner {
    /// Mark closed, reject pending calls and wake `closed()` waiters
    async fn shutdown(&self, reason: &str) {
        let mut pending = self.pending.lock().await;
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), reason = %reason, "Rejecting pending calls");
        }
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(KnipviewError::connection("connection closed")));
        }
        drop(pending);

        self.closed_signal.send_replace(true);
    }

    /// Route one incoming frame
    async fn dispatch(self: &Arc<Self>, text: String, handler: &Arc<dyn RpcHandler>) {
        let frame = match self.options.codec.deserialize(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        match frame {
            Frame::Request { id, method, args } => {
                let inner = Arc::clone(self);
                let handler = Arc::clone(handler);
                let span = call_span(&method, id.as_deref());

                tokio::spawn(
                    async move {
                        let outcome = handler.handle(&method, args).await;
                        if let Err(e) = &outcome {
                            debug!(error = %e, kind = e.kind(), "Call failed");
                        }

                        let Some(id) = id else {
                            return;
                        };
                        let reply = Frame::reply(id, &outcome)
                            .and_then(|frame| inner.options.codec.serialize(&frame));
                        match reply {
                            Ok(text) => {
                                if inner.outgoing.send(text).is_err() {
                                    debug!("Connection closed before reply was sent");
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to encode reply"),
                        }
                    }
                    .instrument(span),
                );
            }
            Frame::Response { id, result, error } => {
                let outcome = match error {
                    Some(error) => Err(remote_error(error)),
                    None => Ok(result.unwrap_or(Value::Null)),
                };

                match self.pending.lock().await.remove(&id) {
                    Some(sender) => {
                        let _ = sender.send(outcome);
                    }
                    None => warn!(call_id = %id, "Received reply for unknown call"),
                }
            }
        }
    }
}

/// Rebuild an error received from the peer
fn remote_error(value: Value) -> KnipviewError {
    match serde_json::from_value::<ErrorEnvelope>(value.clone()) {
        Ok(envelope) => envelope.into(),
        Err(_) => KnipviewError::Remote {
            kind: "Error".to_string(),
            message: match value {
                Value::String(message) => message,
                other => other.to_string(),
            },
            stack: None,
        },
    }
}

async fn read_loop<S>(inner: Arc<Inner>, handler: Arc<dyn RpcHandler>, incoming: S)
where
    S: Stream<Item = String> + Send + 'static,
{
    let mut incoming = Box::pin(incoming);
    let mut closed = inner.closed_signal.subscribe();

    loop {
        tokio::select! {
            message = incoming.next() => match message {
                Some(text) => inner.dispatch(text, &handler).await,
                None => {
                    debug!("Incoming stream ended");
                    break;
                }
            },
            _ = closed.changed() => break,
        }
    }

    inner.shutdown("connection closed").await;
}

async fn write_loop<K>(inner: Arc<Inner>, mut queue: mpsc::UnboundedReceiver<String>, outgoing: K)
where
    K: Sink<String> + Send + 'static,
    K::Error: fmt::Display + Send,
{
    let mut outgoing = Box::pin(outgoing);
    let mut closed = inner.closed_signal.subscribe();

    loop {
        tokio::select! {
            message = queue.recv() => {
                let Some(text) = message else { break };
                if let Err(e) = outgoing.send(text).await {
                    warn!(error = %e, "Failed to send frame");
                    break;
                }
            }
            _ = closed.changed() => {
                // flush replies queued before the close
                while let Ok(text) = queue.try_recv() {
                    if outgoing.send(text).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }

    if let Err(e) = outgoing.close().await {
        debug!(error = %e, "Failed to close outgoing sink");
    }
    inner.shutdown("outgoing channel closed").await;
}
