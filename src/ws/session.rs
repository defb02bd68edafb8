//! Authenticated WebSocket session with reconnection.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::auth::{CredentialsProvider, NonceProvider};
use crate::error::BrokerError;
use crate::rest::{BalancesResponse, EstimateResponse, OrderStatusResponse, SwapResponse};
use crate::ws::client::WsConfig;
use crate::ws::messages::{
    ChannelMessage, InboundMessage, OrderStatusParams, WsErrorMessage, WsFrame, WsSwapParams,
    operations,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsReceiver = SplitStream<WsStream>;

/// Callback invoked for every message on a subscribed channel.
pub type MessageHandler = Arc<dyn Fn(ChannelMessage) + Send + Sync>;

type PendingResult = Result<Value, BrokerError>;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Auth frame sent, waiting for the reply.
    Authenticating,
    /// Ready for subscriptions and signed operations.
    Authenticated,
}

/// Lifecycle and unsolicited events from a session.
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// The session (re-)authenticated.
    Authenticated,
    /// The transport went away.
    Disconnected {
        /// Close reason or transport error.
        reason: String,
    },
    /// A reconnection attempt is scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// Reconnected, re-authenticated and re-subscribed.
    Reconnected {
        /// Number of channels re-subscribed.
        resubscribed: usize,
    },
    /// The backoff policy ran out of attempts; the session is dead.
    ReconnectFailed {
        /// Attempts made.
        attempts: u32,
    },
    /// An operation response nobody was waiting for.
    Response {
        /// Operation name.
        op: String,
        /// Response payload.
        data: Option<Value>,
    },
    /// An error frame nobody was waiting for.
    Error {
        /// Operation the error refers to, if any.
        op: Option<String>,
        /// Error text.
        message: String,
    },
    /// Subscription acknowledged.
    Subscribed {
        /// Channel name.
        channel: Option<String>,
    },
    /// Unsubscription acknowledged.
    Unsubscribed {
        /// Channel name.
        channel: Option<String>,
    },
}

/// A frame awaiting its reply.
///
/// Subscribe and unsubscribe frames have no caller waiting (`tx` is `None`)
/// but are tracked so a bare error can be attributed to them.
struct PendingRequest {
    id: u64,
    op: String,
    sent_at: Instant,
    tx: Option<oneshot::Sender<PendingResult>>,
}

/// An authenticated Broker WebSocket session.
///
/// A single background task reads the connection, dispatches channel
/// messages to their handlers, resolves waiting operations, and reconnects
/// with backoff when the transport drops. After every reconnect the session
/// re-authenticates and re-subscribes to every registered channel.
///
/// Lifecycle events are queued until [`take_events`](Self::take_events) is
/// called. Dropping the session stops the background task.
pub struct WsSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    url: String,
    credentials: Arc<dyn CredentialsProvider>,
    nonce_provider: Arc<dyn NonceProvider>,
    config: WsConfig,
    state: RwLock<ConnectionState>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    subscriptions: RwLock<HashMap<String, Vec<MessageHandler>>>,
    pending: Mutex<VecDeque<PendingRequest>>,
    next_request_id: AtomicU64,
    events: mpsc::UnboundedSender<WsEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<WsEvent>>>,
    shutdown: watch::Sender<bool>,
}

impl WsSession {
    /// Open the transport, authenticate, and start the reader task.
    pub(crate) async fn connect(
        url: String,
        credentials: Arc<dyn CredentialsProvider>,
        nonce_provider: Arc<dyn NonceProvider>,
        config: WsConfig,
    ) -> Result<Self, BrokerError> {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let inner = Arc::new(SessionInner {
            url,
            credentials,
            nonce_provider,
            config,
            state: RwLock::new(ConnectionState::Disconnected),
            sink: tokio::sync::Mutex::new(None),
            subscriptions: RwLock::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
            next_request_id: AtomicU64::new(1),
            events,
            events_rx: Mutex::new(Some(events_rx)),
            shutdown,
        });

        let receiver = inner.establish().await?;
        tokio::spawn(run_reader(inner.clone(), receiver));

        Ok(Self { inner })
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Whether the session is ready for requests.
    pub fn is_authenticated(&self) -> bool {
        self.state() == ConnectionState::Authenticated
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Channels that currently have handlers.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.read().keys().cloned().collect()
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn take_events(&self) -> Option<UnboundedReceiverStream<WsEvent>> {
        self.inner
            .events_rx
            .lock()
            .take()
            .map(UnboundedReceiverStream::new)
    }

    /// Register a handler for a channel.
    ///
    /// The subscribe frame is sent when the first handler for a channel is
    /// registered. Handlers run on their own tasks; a slow or panicking
    /// handler does not affect the others.
    pub async fn subscribe<F>(&self, channel: impl Into<String>, handler: F) -> Result<(), BrokerError>
    where
        F: Fn(ChannelMessage) + Send + Sync + 'static,
    {
        self.ensure_authenticated()?;
        let channel = channel.into();

        let handler: MessageHandler = Arc::new(handler);

        let first = {
            let mut subscriptions = self.inner.subscriptions.write();
            let handlers = subscriptions.entry(channel.clone()).or_default();
            handlers.push(handler.clone());
            handlers.len() == 1
        };

        if first {
            tracing::debug!(channel = %channel, "subscribing");
            let frame = WsFrame::subscribe(channel.as_str());
            if let Err(e) = self.inner.send_control(operations::SUBSCRIBE, &frame).await {
                self.inner.remove_handler(&channel, &handler);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove every handler for a channel and unsubscribe.
    pub async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError> {
        self.ensure_authenticated()?;
        self.inner.subscriptions.write().remove(channel);
        tracing::debug!(channel = %channel, "unsubscribing");
        self.inner
            .send_control(operations::UNSUBSCRIBE, &WsFrame::unsubscribe(channel))
            .await
    }

    /// Request a swap estimate.
    pub async fn estimate(&self, params: &WsSwapParams) -> Result<EstimateResponse, BrokerError> {
        let data = self.request(operations::ESTIMATE, Some(params)).await?;
        parse_data(operations::ESTIMATE, data)
    }

    /// Execute a swap.
    ///
    /// There is no idempotency key on this transport; a swap that times out
    /// locally may still execute.
    pub async fn swap(&self, params: &WsSwapParams) -> Result<SwapResponse, BrokerError> {
        let data = self.request(operations::SWAP, Some(params)).await?;
        parse_data(operations::SWAP, data)
    }

    /// Look up the status of an order.
    pub async fn order_status(&self, order_id: &str) -> Result<OrderStatusResponse, BrokerError> {
        let params = OrderStatusParams {
            id: order_id.to_string(),
        };
        let data = self.request(operations::ORDER_STATUS, Some(&params)).await?;
        parse_data(operations::ORDER_STATUS, data)
    }

    /// Get a balance snapshot.
    pub async fn balances(&self) -> Result<BalancesResponse, BrokerError> {
        let data = self.request::<()>(operations::BALANCES, None).await?;
        parse_data(operations::BALANCES, data)
    }

    /// Send a signed operation and wait for its response payload.
    ///
    /// Responses are matched to callers per operation in send order.
    pub async fn request<T>(&self, op: &str, data: Option<&T>) -> Result<Value, BrokerError>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_authenticated()?;

        let data = data.map(serde_json::to_string).transpose()?;
        let frame = WsFrame::signed(
            op,
            self.inner.credentials.get_credentials(),
            self.inner.nonce_provider.as_ref(),
            data,
        )?;

        let (tx, rx) = oneshot::channel();
        let id = self.inner.track(op, Some(tx));

        tracing::debug!(op = %op, id, "sending signed operation");
        if let Err(e) = self.inner.send_frame(&frame).await {
            self.inner.remove_pending(id);
            return Err(e);
        }

        match tokio::time::timeout(self.inner.config.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BrokerError::ConnectionClosed {
                reason: "session dropped".to_string(),
            }),
            Err(_) => {
                self.inner.remove_pending(id);
                tracing::warn!(op = %op, id, "operation timed out");
                Err(BrokerError::Timeout)
            }
        }
    }

    /// Close the session permanently.
    ///
    /// Stops reconnection, drops all subscriptions and fails waiting
    /// operations.
    pub async fn close(&self) -> Result<(), BrokerError> {
        self.inner.shutdown.send_replace(true);
        self.inner.subscriptions.write().clear();

        let sink = self.inner.sink.lock().await.take();
        if let Some(mut sink) = sink {
            let _ = sink.send(WsMessage::Close(None)).await;
            let _ = sink.close().await;
        }

        self.inner.set_state(ConnectionState::Disconnected);
        self.inner.fail_pending("session closed");
        tracing::info!(url = %self.inner.url, "session closed");
        Ok(())
    }

    fn ensure_authenticated(&self) -> Result<(), BrokerError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(BrokerError::NotAuthenticated)
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.inner.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("subscriptions", &self.inner.subscriptions.read().len())
            .field("pending", &self.inner.pending.lock().len())
            .finish()
    }
}

impl SessionInner {
    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    fn emit(&self, event: WsEvent) {
        let _ = self.events.send(event);
    }

    /// Open the transport and authenticate.
    async fn establish(&self) -> Result<WsReceiver, BrokerError> {
        self.set_state(ConnectionState::Connecting);
        match self.open_and_authenticate().await {
            Ok(receiver) => {
                self.set_state(ConnectionState::Authenticated);
                tracing::info!(url = %self.url, "authenticated");
                self.emit(WsEvent::Authenticated);
                Ok(receiver)
            }
            Err(e) => {
                if let Some(mut sink) = self.sink.lock().await.take() {
                    let _ = sink.close().await;
                }
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn open_and_authenticate(&self) -> Result<WsReceiver, BrokerError> {
        tracing::debug!(url = %self.url, "connecting");
        let (stream, _) =
            match tokio::time::timeout(self.config.connect_timeout, connect_async(self.url.as_str()))
                .await
            {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => {
                    return Err(BrokerError::WebSocketMsg(format!(
                        "Failed to connect to {}: {}",
                        self.url, e
                    )));
                }
                Err(_) => return Err(BrokerError::Timeout),
            };

        let (sink, mut receiver) = stream.split();
        *self.sink.lock().await = Some(sink);

        self.set_state(ConnectionState::Authenticating);
        let frame = WsFrame::auth(
            self.credentials.get_credentials(),
            self.nonce_provider.as_ref(),
        )?;
        self.send_frame(&frame).await?;
        self.wait_for_auth(&mut receiver).await?;

        Ok(receiver)
    }

    /// Wait for the `auth` reply, ignoring unrelated frames.
    async fn wait_for_auth(&self, receiver: &mut WsReceiver) -> Result<(), BrokerError> {
        let deadline = Instant::now() + self.config.auth_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let message = match tokio::time::timeout(remaining, receiver.next()).await {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(e))) => return Err(BrokerError::WebSocket(e)),
                Ok(None) => {
                    return Err(BrokerError::ConnectionClosed {
                        reason: "closed during authentication".to_string(),
                    });
                }
                Err(_) => {
                    tracing::warn!(url = %self.url, "timed out waiting for auth response");
                    return Err(BrokerError::Timeout);
                }
            };

            let text = match &message {
                WsMessage::Text(text) => text.as_str(),
                WsMessage::Binary(data) => match std::str::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                WsMessage::Close(frame) => {
                    return Err(BrokerError::ConnectionClosed {
                        reason: close_reason(frame.as_ref()),
                    });
                }
                _ => continue,
            };

            let value: Value = match serde_json::from_str(text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Failed to parse WebSocket message: {}", e);
                    continue;
                }
            };

            match InboundMessage::classify(value) {
                InboundMessage::Error(error) => {
                    tracing::warn!(error = %error.message, "authentication rejected");
                    return Err(BrokerError::Auth(error.message));
                }
                InboundMessage::Response { op, .. } if op == operations::AUTH => return Ok(()),
                other => tracing::debug!(message = ?other, "ignoring frame during authentication"),
            }
        }
    }

    /// Send a frame through the shared sink.
    async fn send_frame(&self, frame: &WsFrame) -> Result<(), BrokerError> {
        let json = frame.to_json()?;
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or_else(|| BrokerError::ConnectionClosed {
            reason: "not connected".to_string(),
        })?;
        sink.send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| BrokerError::WebSocketMsg(format!("Failed to send message: {}", e)))
    }

    /// Read frames until the transport goes away or the session is closed.
    ///
    /// Returns the disconnect reason.
    async fn read_until_closed(
        &self,
        receiver: &mut WsReceiver,
        shutdown: &mut watch::Receiver<bool>,
    ) -> String {
        loop {
            let next = tokio::select! {
                message = receiver.next() => message,
                _ = wait_for_shutdown(shutdown) => return "session closed".to_string(),
            };

            match next {
                Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
                Some(Ok(WsMessage::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => self.handle_text(text),
                    Err(_) => tracing::warn!("Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => return close_reason(frame.as_ref()),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error: {}", e);
                    return e.to_string();
                }
                None => return "stream ended".to_string(),
            }
        }
    }

    /// Parse and dispatch one inbound frame.
    fn handle_text(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to parse WebSocket message: {}", e);
                return;
            }
        };

        match InboundMessage::classify(value) {
            InboundMessage::Error(error) => self.handle_error(error),
            InboundMessage::Response { op, ch, data } => self.handle_response(op, ch, data),
            InboundMessage::ChannelData(message) => self.dispatch(message),
            InboundMessage::Unknown(value) => {
                tracing::debug!(message = %value, "Unknown message format");
            }
        }
    }

    fn handle_error(&self, error: WsErrorMessage) {
        match self.take_pending(error.op.as_deref()) {
            Some(PendingRequest { tx: Some(tx), .. }) => {
                let _ = tx.send(Err(error.into_error()));
            }
            Some(PendingRequest { op, tx: None, .. }) => {
                tracing::warn!(op = %op, error = %error.message, "request rejected");
                self.emit(WsEvent::Error {
                    op: Some(op),
                    message: error.message,
                });
            }
            None => {
                tracing::warn!(op = ?error.op, error = %error.message, "unsolicited error");
                self.emit(WsEvent::Error {
                    op: error.op,
                    message: error.message,
                });
            }
        }
    }

    fn handle_response(&self, op: String, ch: Option<String>, data: Option<Value>) {
        match op.as_str() {
            operations::AUTH => tracing::debug!("duplicate auth response"),
            operations::SUBSCRIBE => {
                self.take_pending(Some(&op));
                self.emit(WsEvent::Subscribed { channel: ch });
            }
            operations::UNSUBSCRIBE => {
                self.take_pending(Some(&op));
                self.emit(WsEvent::Unsubscribed { channel: ch });
            }
            _ => match self.take_pending(Some(&op)) {
                Some(PendingRequest { tx: Some(tx), .. }) => {
                    let _ = tx.send(Ok(data.unwrap_or(Value::Null)));
                }
                _ => self.emit(WsEvent::Response { op, data }),
            },
        }
    }

    /// Invoke every handler for the message's channel on its own task.
    fn dispatch(&self, message: ChannelMessage) {
        let handlers = self
            .subscriptions
            .read()
            .get(&message.channel)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::debug!(channel = %message.channel, "no handlers for channel");
            return;
        }

        for handler in handlers {
            let message = message.clone();
            tokio::spawn(async move { handler(message) });
        }
    }

    /// Register a sent frame in the pending table.
    fn track(&self, op: &str, tx: Option<oneshot::Sender<PendingResult>>) -> u64 {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().push_back(PendingRequest {
            id,
            op: op.to_string(),
            sent_at: Instant::now(),
            tx,
        });
        id
    }

    /// Send a subscribe or unsubscribe frame, tracked until acknowledged.
    async fn send_control(&self, op: &str, frame: &WsFrame) -> Result<(), BrokerError> {
        let id = self.track(op, None);
        let result = self.send_frame(frame).await;
        if result.is_err() {
            self.remove_pending(id);
        }
        result
    }

    /// Remove the oldest pending frame for `op`, or the oldest overall.
    ///
    /// Untracked control frames older than `request_timeout` are dropped
    /// first, since the server may never acknowledge them.
    fn take_pending(&self, op: Option<&str>) -> Option<PendingRequest> {
        let mut pending = self.pending.lock();
        let timeout = self.config.request_timeout;
        pending.retain(|p| p.tx.is_some() || p.sent_at.elapsed() < timeout);

        let index = match op {
            Some(op) => pending.iter().position(|p| p.op == op)?,
            None => 0,
        };
        pending.remove(index)
    }

    fn remove_handler(&self, channel: &str, handler: &MessageHandler) {
        let mut subscriptions = self.subscriptions.write();
        if let Some(handlers) = subscriptions.get_mut(channel) {
            handlers.retain(|h| !Arc::ptr_eq(h, handler));
            if handlers.is_empty() {
                subscriptions.remove(channel);
            }
        }
    }

    fn remove_pending(&self, id: u64) {
        self.pending.lock().retain(|p| p.id != id);
    }

    fn fail_pending(&self, reason: &str) {
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        for tx in drained.into_iter().filter_map(|request| request.tx) {
            let _ = tx.send(Err(BrokerError::ConnectionClosed {
                reason: reason.to_string(),
            }));
        }
    }

    async fn on_disconnect(&self, reason: &str) {
        self.set_state(ConnectionState::Disconnected);
        self.sink.lock().await.take();
        self.fail_pending(reason);
        tracing::info!(url = %self.url, reason = %reason, "disconnected");
        self.emit(WsEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Reconnect with backoff. Returns `None` when the session should stop.
    async fn reconnect(&self, shutdown: &mut watch::Receiver<bool>) -> Option<WsReceiver> {
        let backoff = &self.config.backoff;
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);
            if !backoff.allows(attempt) {
                let attempts = attempt - 1;
                tracing::error!(url = %self.url, attempts, "giving up on reconnection");
                self.emit(WsEvent::ReconnectFailed { attempts });
                return None;
            }

            let delay = backoff.delay_for(attempt);
            tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
            self.emit(WsEvent::Reconnecting { attempt, delay });

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(shutdown) => return None,
            }

            match self.establish().await {
                Ok(receiver) => match self.restore_subscriptions().await {
                    Ok(resubscribed) => {
                        tracing::info!(attempt, resubscribed, "reconnected");
                        self.emit(WsEvent::Reconnected { resubscribed });
                        return Some(receiver);
                    }
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "failed to restore subscriptions");
                        self.set_state(ConnectionState::Disconnected);
                        self.sink.lock().await.take();
                    }
                },
                Err(e) => tracing::warn!(attempt, error = %e, "reconnect attempt failed"),
            }
        }
    }

    /// Re-send subscribe for every registered channel.
    async fn restore_subscriptions(&self) -> Result<usize, BrokerError> {
        let channels: Vec<String> = self.subscriptions.read().keys().cloned().collect();
        for channel in &channels {
            self.send_control(operations::SUBSCRIBE, &WsFrame::subscribe(channel.as_str()))
                .await?;
        }
        Ok(channels.len())
    }
}

async fn run_reader(inner: Arc<SessionInner>, mut receiver: WsReceiver) {
    let mut shutdown = inner.shutdown.subscribe();

    loop {
        let reason = inner.read_until_closed(&mut receiver, &mut shutdown).await;
        inner.on_disconnect(&reason).await;

        if inner.is_closed() {
            break;
        }

        match inner.reconnect(&mut shutdown).await {
            Some(next) => receiver = next,
            None => break,
        }
    }

    tracing::debug!(url = %inner.url, "reader task finished");
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn close_reason(frame: Option<&CloseFrame>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("closed by server ({}): {}", u16::from(frame.code), frame.reason.as_str())
        }
        Some(frame) => format!("closed by server ({})", u16::from(frame.code)),
        None => "closed by server".to_string(),
    }
}

fn parse_data<T: DeserializeOwned>(op: &str, data: Value) -> Result<T, BrokerError> {
    serde_json::from_value(data.clone()).map_err(|e| {
        BrokerError::InvalidResponse(format!(
            "Failed to parse {} response: {}. Data: {}",
            op, e, data
        ))
    })
}
