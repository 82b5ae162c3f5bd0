//! Device event hub client.
//!
//! The data center pushes live telemetry over a JSON hub protocol carried
//! on a WebSocket. Every record is a JSON object terminated by `0x1E`:
//!
//! - handshake: client sends `{"protocol":"json","version":1}`, server
//!   answers `{}` (or `{"error": ...}`)
//! - `type 1` invocation (either direction), `type 3` completion,
//!   `type 6` ping, `type 7` close
//!
//! [`HubConnection`] owns one logical connection. After the first
//! successful [`start`](HubConnection::start), a background task keeps it
//! alive with pings and reconnects with exponential backoff when the
//! socket drops. Callers observe this through [`HubState`] (a `watch`
//! snapshot) and [`HubLifecycle`] events (a `broadcast` stream).
//!
//! ```rust,ignore
//! let hub = HubConnection::new(url, Some(tokens), HubOptions::default());
//! hub.on("DeviceDataReceived", |args| println!("{args:?}"));
//! hub.start().await?;
//! hub.invoke("SubscribeModel", vec![json!(model_id)]).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::error::Error;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;
type Pending = HashMap<String, oneshot::Sender<Result<Value, String>>>;

/// Terminates every record on the wire.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const HANDSHAKE: &str = r#"{"protocol":"json","version":1}"#;
const LIFECYCLE_CHANNEL_CAPACITY: usize = 16;

// ── Wire messages ────────────────────────────────────────────────────

/// One decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        invocation_id: Option<String>,
        target: String,
        arguments: Vec<Value>,
    },
    Completion {
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Streaming and cancellation kinds, which this client never uses.
    Other(u64),
}

impl HubMessage {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Invocation {
                invocation_id,
                target,
                arguments,
            } => {
                let mut v = json!({ "type": 1, "target": target, "arguments": arguments });
                if let Some(id) = invocation_id {
                    v["invocationId"] = json!(id);
                }
                v
            }
            Self::Completion {
                invocation_id,
                result,
                error,
            } => {
                let mut v = json!({ "type": 3, "invocationId": invocation_id });
                if let Some(result) = result {
                    v["result"] = result.clone();
                }
                if let Some(error) = error {
                    v["error"] = json!(error);
                }
                v
            }
            Self::Ping => json!({ "type": 6 }),
            Self::Close {
                error,
                allow_reconnect,
            } => {
                let mut v = json!({ "type": 7, "allowReconnect": allow_reconnect });
                if let Some(error) = error {
                    v["error"] = json!(error);
                }
                v
            }
            Self::Other(kind) => json!({ "type": kind }),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let kind = value
            .get("type")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("record has no numeric `type`", value))?;
        let text = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_owned);

        Ok(match kind {
            1 => Self::Invocation {
                invocation_id: text("invocationId"),
                target: text("target").ok_or_else(|| malformed("invocation has no target", value))?,
                arguments: value
                    .get("arguments")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
            3 => Self::Completion {
                invocation_id: text("invocationId")
                    .ok_or_else(|| malformed("completion has no invocationId", value))?,
                result: value.get("result").cloned(),
                error: text("error"),
            },
            6 => Self::Ping,
            7 => Self::Close {
                error: text("error"),
                allow_reconnect: value
                    .get("allowReconnect")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            other => Self::Other(other),
        })
    }
}

fn malformed(message: &str, value: &Value) -> Error {
    Error::Deserialization {
        message: message.to_owned(),
        body: value.to_string(),
    }
}

/// Serialize one record, separator included.
pub fn encode(message: &HubMessage) -> String {
    let mut text = message.to_value().to_string();
    text.push(RECORD_SEPARATOR);
    text
}

/// Split a text frame into its records. A frame may carry several.
pub fn split_records(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
}

/// Map an `http(s)` service URL onto the matching `ws(s)` scheme.
pub fn websocket_url(url: &Url) -> Result<Url, Error> {
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(url.clone()),
        other => {
            return Err(Error::HubConnect(format!(
                "unsupported URL scheme '{other}' for hub"
            )));
        }
    };
    let mut ws = url.clone();
    ws.set_scheme(scheme)
        .map_err(|()| Error::HubConnect(format!("cannot map {url} to {scheme}")))?;
    Ok(ws)
}

// ── Configuration ────────────────────────────────────────────────────

/// Exponential backoff configuration for hub reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever. Default: 4.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubOptions {
    pub reconnect: ReconnectConfig,
    /// Idle interval after which the client sends a ping.
    pub keep_alive_interval: Duration,
    /// The connection is considered lost when nothing arrives for this long.
    pub server_timeout: Duration,
    pub handshake_timeout: Duration,
    pub invocation_timeout: Duration,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            keep_alive_interval: Duration::from_secs(15),
            server_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(15),
            invocation_timeout: Duration::from_secs(30),
        }
    }
}

// ── State ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

/// Transitions of an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubLifecycle {
    /// The socket dropped; the reconnect loop is running.
    Reconnecting,
    /// A reconnect attempt succeeded. Server-side group membership does
    /// not survive, so subscriptions must be re-invoked.
    Reconnected,
    /// The connection is gone for good: stopped, closed by the server, or
    /// out of reconnect attempts.
    Closed,
}

// ── HubConnection ────────────────────────────────────────────────────

struct Shared {
    url: Url,
    tokens: Option<Arc<dyn TokenProvider>>,
    options: HubOptions,
    state: watch::Sender<HubState>,
    lifecycle: broadcast::Sender<HubLifecycle>,
    handlers: Mutex<HashMap<String, Vec<Handler>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    pending: Mutex<Pending>,
    next_invocation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn attach_outbound(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.outbound) = Some(tx);
        rx
    }

    /// Detach the writer and fail every in-flight invocation.
    fn detach(&self) {
        lock(&self.outbound).take();
        lock(&self.pending).clear();
    }

    fn send_text(&self, text: String) -> Result<(), Error> {
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx
                .send(Message::text(text))
                .map_err(|_| Error::HubNotConnected),
            None => Err(Error::HubNotConnected),
        }
    }

    fn dispatch(&self, method: &str, arguments: &[Value]) {
        let handlers = lock(&self.handlers)
            .get(&method.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default();
        if handlers.is_empty() {
            trace!(method, "no handler registered");
        }
        for handler in handlers {
            handler(arguments);
        }
    }

    fn complete(&self, invocation_id: &str, result: Option<Value>, error: Option<String>) {
        let Some(tx) = lock(&self.pending).remove(invocation_id) else {
            debug!(invocation_id, "completion for unknown invocation");
            return;
        };
        let outcome = match error {
            Some(message) => Err(message),
            None => Ok(result.unwrap_or(Value::Null)),
        };
        let _ = tx.send(outcome);
    }
}

/// A device event hub connection with automatic reconnect.
pub struct HubConnection {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HubConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConnection")
            .field("url", &self.shared.url.as_str())
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

impl HubConnection {
    /// Create an unstarted connection to `url` (a `ws://` or `wss://` URL).
    pub fn new(url: Url, tokens: Option<Arc<dyn TokenProvider>>, options: HubOptions) -> Self {
        let (state, _) = watch::channel(HubState::Disconnected);
        let (lifecycle, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                url,
                tokens,
                options,
                state,
                lifecycle,
                handlers: Mutex::new(HashMap::new()),
                outbound: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                next_invocation: AtomicU64::new(0),
            }),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Connect, complete the handshake, and spawn the keep-alive and
    /// reconnect loop.
    ///
    /// A failure here is final: the reconnect loop only runs for
    /// connections that were established at least once.
    pub async fn start(&self) -> Result<(), Error> {
        if lock(&self.task).is_some() {
            return Ok(());
        }

        self.shared.state.send_replace(HubState::Connecting);
        let ws = match connect(&self.shared).await {
            Ok(ws) => ws,
            Err(e) => {
                self.shared.state.send_replace(HubState::Disconnected);
                return Err(e);
            }
        };

        let outbound = self.shared.attach_outbound();
        self.shared.state.send_replace(HubState::Connected);
        info!(url = %self.shared.url, "device event hub connected");

        let handle = tokio::spawn(hub_loop(
            Arc::clone(&self.shared),
            ws,
            outbound,
            self.cancel.clone(),
        ));
        *lock(&self.task) = Some(handle);
        Ok(())
    }

    /// Invoke a hub method and wait for its completion.
    pub async fn invoke(&self, method: &str, arguments: Vec<Value>) -> Result<Value, Error> {
        let id = self
            .shared
            .next_invocation
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        let (tx, rx) = oneshot::channel();
        lock(&self.shared.pending).insert(id.clone(), tx);

        let message = HubMessage::Invocation {
            invocation_id: Some(id.clone()),
            target: method.to_owned(),
            arguments,
        };
        if let Err(e) = self.shared.send_text(encode(&message)) {
            lock(&self.shared.pending).remove(&id);
            return Err(e);
        }
        debug!(method, invocation_id = %id, "hub invoke");

        let timeout = self.shared.options.invocation_timeout;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(Error::HubInvocation {
                target: method.to_owned(),
                message,
            }),
            Ok(Err(_)) => Err(Error::HubClosed {
                reason: format!("connection lost before '{method}' completed"),
            }),
            Err(_) => {
                lock(&self.shared.pending).remove(&id);
                Err(Error::Timeout {
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }

    /// Register a handler for server-to-client invocations of `method`.
    /// Method names match case-insensitively.
    pub fn on<F>(&self, method: &str, handler: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        lock(&self.shared.handlers)
            .entry(method.to_ascii_lowercase())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Detach every registered handler.
    pub fn off_all(&self) {
        lock(&self.shared.handlers).clear();
    }

    pub fn state(&self) -> HubState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<HubState> {
        self.shared.state.subscribe()
    }

    pub fn lifecycle(&self) -> broadcast::Receiver<HubLifecycle> {
        self.shared.lifecycle.subscribe()
    }

    /// Close the connection and wait for the background task to exit.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = lock(&self.task).take();
        match task {
            Some(handle) => {
                if let Err(e) = handle.await {
                    warn!(error = %e, "hub task ended abnormally");
                }
            }
            None => {
                self.shared.state.send_replace(HubState::Disconnected);
            }
        }
    }
}

impl Drop for HubConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background loop ──────────────────────────────────────────────────

enum ConnectionEnd {
    Cancelled,
    /// Server sent a close record that does not allow reconnecting.
    Closed(String),
    Dropped(String),
}

async fn hub_loop(
    shared: Arc<Shared>,
    first: WsStream,
    first_outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    let mut next = Some((first, first_outbound));

    loop {
        let (ws, outbound) = match next.take() {
            Some(conn) => conn,
            None => match reconnect(&shared, &cancel).await {
                Some(conn) => conn,
                None => break,
            },
        };

        match run_connection(&shared, ws, outbound, &cancel).await {
            ConnectionEnd::Cancelled => break,
            ConnectionEnd::Closed(reason) => {
                info!(reason = %reason, "hub closed by server");
                break;
            }
            ConnectionEnd::Dropped(reason) => {
                warn!(reason = %reason, "hub connection lost");
            }
        }
    }

    shared.detach();
    shared.state.send_replace(HubState::Disconnected);
    let _ = shared.lifecycle.send(HubLifecycle::Closed);
    debug!("hub loop exiting");
}

async fn reconnect(
    shared: &Shared,
    cancel: &CancellationToken,
) -> Option<(WsStream, mpsc::UnboundedReceiver<Message>)> {
    let _ = shared.lifecycle.send(HubLifecycle::Reconnecting);
    let config = &shared.options.reconnect;
    let mut attempt: u32 = 0;

    loop {
        if let Some(max) = config.max_retries {
            if attempt >= max {
                error!(max_retries = max, "hub reconnection limit reached, giving up");
                return None;
            }
        }

        shared
            .state
            .send_replace(HubState::Reconnecting { attempt: attempt + 1 });
        let delay = calculate_backoff(attempt, config);
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before hub reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            () = tokio::time::sleep(delay) => {}
        }
        attempt += 1;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            result = connect(shared) => result,
        };
        match result {
            Ok(ws) => {
                let outbound = shared.attach_outbound();
                shared.state.send_replace(HubState::Connected);
                info!(attempt, "device event hub reconnected");
                let _ = shared.lifecycle.send(HubLifecycle::Reconnected);
                return Some((ws, outbound));
            }
            Err(e) => warn!(error = %e, attempt, "hub reconnect attempt failed"),
        }
    }
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect(shared: &Shared) -> Result<WsStream, Error> {
    info!(url = %shared.url, "connecting to device event hub");

    let uri: tungstenite::http::Uri = shared
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::HubConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(token) = shared.tokens.as_ref().and_then(|t| t.access_token()) {
        request = request.with_header(
            "Authorization",
            format!("Bearer {}", token.expose_secret()),
        );
    }

    let (mut ws, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::HubConnect(e.to_string()))?;

    ws.send(Message::text(format!("{HANDSHAKE}{RECORD_SEPARATOR}")))
        .await
        .map_err(|e| Error::HubConnect(e.to_string()))?;

    tokio::time::timeout(shared.options.handshake_timeout, read_handshake(&mut ws))
        .await
        .map_err(|_| Error::HubConnect("handshake timed out".into()))??;

    Ok(ws)
}

async fn read_handshake(ws: &mut WsStream) -> Result<(), Error> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let Some(record) = split_records(text.as_str()).next() else {
                    continue;
                };
                let reply: Value = serde_json::from_str(record).map_err(|e| {
                    Error::HubConnect(format!("invalid handshake response: {e}"))
                })?;
                if let Some(err) = reply.get("error").and_then(Value::as_str) {
                    return Err(Error::HubConnect(format!("handshake rejected: {err}")));
                }
                return Ok(());
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(Error::HubConnect("connection closed during handshake".into()));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(Error::HubConnect(e.to_string())),
        }
    }
}

async fn run_connection(
    shared: &Shared,
    ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    let (mut write, mut read) = ws.split();
    let options = &shared.options;

    let mut keep_alive = tokio::time::interval(options.keep_alive_interval);
    keep_alive.tick().await;
    let mut last_seen = Instant::now();

    let end = loop {
        let deadline = last_seen + options.server_timeout;

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break ConnectionEnd::Cancelled;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    last_seen = Instant::now();
                    if let Some(end) = handle_text(shared, text.as_str()) {
                        break end;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "close frame".to_owned(),
                        |cf| format!("close frame {}: {}", cf.code, cf.reason),
                    );
                    break ConnectionEnd::Dropped(reason);
                }
                Some(Ok(_)) => last_seen = Instant::now(),
                Some(Err(e)) => break ConnectionEnd::Dropped(e.to_string()),
                None => break ConnectionEnd::Dropped("stream ended".into()),
            },
            Some(message) = outbound.recv() => {
                if let Err(e) = write.send(message).await {
                    break ConnectionEnd::Dropped(e.to_string());
                }
                keep_alive.reset();
            }
            _ = keep_alive.tick() => {
                trace!("hub keep-alive ping");
                if let Err(e) = write.send(Message::text(encode(&HubMessage::Ping))).await {
                    break ConnectionEnd::Dropped(e.to_string());
                }
            }
            () = tokio::time::sleep_until(deadline) => {
                break ConnectionEnd::Dropped(format!(
                    "no message from server within {}s",
                    options.server_timeout.as_secs()
                ));
            }
        }
    };

    shared.detach();
    end
}

fn handle_text(shared: &Shared, text: &str) -> Option<ConnectionEnd> {
    for record in split_records(text) {
        let value: Value = match serde_json::from_str(record) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "ignoring malformed hub record");
                continue;
            }
        };

        match HubMessage::from_value(&value) {
            Ok(HubMessage::Invocation {
                target, arguments, ..
            }) => shared.dispatch(&target, &arguments),
            Ok(HubMessage::Completion {
                invocation_id,
                result,
                error,
            }) => shared.complete(&invocation_id, result, error),
            Ok(HubMessage::Ping) => trace!("hub ping"),
            Ok(HubMessage::Close {
                error,
                allow_reconnect,
            }) => {
                let reason = error.unwrap_or_else(|| "server closed the connection".into());
                return Some(if allow_reconnect {
                    ConnectionEnd::Dropped(reason)
                } else {
                    ConnectionEnd::Closed(reason)
                });
            }
            Ok(HubMessage::Other(kind)) => trace!(kind, "ignoring hub message"),
            Err(e) => debug!(error = %e, "ignoring malformed hub record"),
        }
    }
    None
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% so many consoles dropped by one server restart do not
/// reconnect in lockstep.
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_retries, Some(4));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn encode_terminates_with_separator() {
        let text = encode(&HubMessage::Invocation {
            invocation_id: Some("0".into()),
            target: "SubscribeModel".into(),
            arguments: vec![json!("m1")],
        });
        assert!(text.ends_with(RECORD_SEPARATOR));
        let value: Value = serde_json::from_str(text.trim_end_matches(RECORD_SEPARATOR)).unwrap();
        assert_eq!(
            value,
            json!({ "type": 1, "invocationId": "0", "target": "SubscribeModel", "arguments": ["m1"] })
        );
    }

    #[test]
    fn frame_with_several_records_splits() {
        let frame = format!("{{\"type\":6}}{RECORD_SEPARATOR}{{\"type\":6}}{RECORD_SEPARATOR}");
        assert_eq!(split_records(&frame).count(), 2);
    }

    #[test]
    fn server_invocation_decodes() {
        let value = json!({
            "type": 1,
            "target": "DeviceDataReceived",
            "arguments": ["dev-1", { "time": "2024-05-01T00:00:00Z", "ubatt": 12400 }]
        });
        let msg = HubMessage::from_value(&value).unwrap();
        let HubMessage::Invocation {
            invocation_id,
            target,
            arguments,
        } = msg
        else {
            panic!("expected invocation, got {msg:?}");
        };
        assert!(invocation_id.is_none());
        assert_eq!(target, "DeviceDataReceived");
        assert_eq!(arguments[0], json!("dev-1"));
    }

    #[test]
    fn completion_with_error_decodes() {
        let value = json!({ "type": 3, "invocationId": "7", "error": "no such model" });
        assert_eq!(
            HubMessage::from_value(&value).unwrap(),
            HubMessage::Completion {
                invocation_id: "7".into(),
                result: None,
                error: Some("no such model".into()),
            }
        );
    }

    #[test]
    fn close_defaults_to_no_reconnect() {
        let msg = HubMessage::from_value(&json!({ "type": 7 })).unwrap();
        assert_eq!(
            msg,
            HubMessage::Close {
                error: None,
                allow_reconnect: false
            }
        );
    }

    #[test]
    fn record_without_type_is_rejected() {
        assert!(HubMessage::from_value(&json!({ "target": "x" })).is_err());
    }

    #[test]
    fn unknown_kinds_are_preserved() {
        assert_eq!(
            HubMessage::from_value(&json!({ "type": 2, "invocationId": "1" })).unwrap(),
            HubMessage::Other(2)
        );
    }

    #[test]
    fn http_urls_map_to_websocket_schemes() {
        let https = Url::parse("https://dc.example.test/api/device-events").unwrap();
        assert_eq!(
            websocket_url(&https).unwrap().as_str(),
            "wss://dc.example.test/api/device-events"
        );
        let http = Url::parse("http://127.0.0.1:5000/device-events").unwrap();
        assert_eq!(websocket_url(&http).unwrap().scheme(), "ws");
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let ftp = Url::parse("ftp://example.test/").unwrap();
        assert!(matches!(websocket_url(&ftp), Err(Error::HubConnect(_))));
    }

    #[tokio::test]
    async fn invoke_before_start_is_not_connected() {
        let hub = HubConnection::new(
            Url::parse("ws://127.0.0.1:9/device-events").unwrap(),
            None,
            HubOptions::default(),
        );
        let err = hub.invoke("SubscribeModel", vec![json!("m1")]).await.unwrap_err();
        assert!(matches!(err, Error::HubNotConnected));
        assert_eq!(hub.state(), HubState::Disconnected);
    }

    #[test]
    fn handlers_dispatch_case_insensitively_until_detached() {
        let hub = HubConnection::new(
            Url::parse("ws://127.0.0.1:9/device-events").unwrap(),
            None,
            HubOptions::default(),
        );
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        hub.on("DeviceDataReceived", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hub.shared.dispatch("devicedatareceived", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        hub.off_all();
        hub.shared.dispatch("DeviceDataReceived", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
