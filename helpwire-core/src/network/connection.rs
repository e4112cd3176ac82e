//! TCP connection lifecycle management.
//!
//! A [`ConnectionManager`] owns one client socket, accumulates
//! received bytes, drains them into packets, validates each against
//! the message catalog, and emits connection and message events. It
//! drives automatic reconnection with a bounded attempt counter.
//!
//! The manager is a single-owner object pumped from the caller's
//! event loop through [`ConnectionManager::next_event`]. Socket I/O
//! and the reconnect timer run in spawned tasks that report back over
//! an internal channel; every report is tagged with the connection
//! epoch so events from a torn-down connection are ignored. All state
//! mutation happens on the pumping task — no locks.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WireError;
use crate::message::MessageKind;
use crate::packet;
use crate::schema;

/// Reconnection gives up after this many consecutive attempts.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay between a disconnect and the next connection attempt.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5000;

// ── Configuration ────────────────────────────────────────────────

/// Connection target and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub auto_reconnect: bool,
    pub reconnect_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7400,
            auto_reconnect: true,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `host:port` dial string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Link state ───────────────────────────────────────────────────

/// The lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No active connection. Initial / terminal state.
    #[default]
    Disconnected,
    /// A dial is in flight.
    Connecting,
    /// The socket is established and traffic may flow.
    Connected,
    /// Waiting out the reconnect interval before the next dial.
    Reconnecting,
    /// The transport reported an error; no socket is active.
    Error,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Error => write!(f, "Error"),
        }
    }
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ── Events ───────────────────────────────────────────────────────

/// Events emitted by a [`ConnectionManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The socket is established.
    Connected,
    /// The socket went away (peer close or explicit disconnect).
    Disconnected,
    /// A reconnect timer was armed.
    Reconnecting { attempt: u32, delay: Duration },
    /// The attempt ceiling was reached; auto-reconnect disabled itself.
    ReconnectsExhausted,
    /// The transport reported an error.
    ConnectionError(String),
    /// A validated inbound message.
    Message {
        kind: MessageKind,
        json: Map<String, Value>,
        bin: Vec<u8>,
    },
}

/// Reports from the spawned I/O tasks, tagged with the epoch of the
/// connection they belong to.
#[derive(Debug)]
enum Internal {
    DialOk(u64, TcpStream),
    DialFailed(u64, String),
    Bytes(u64, Vec<u8>),
    IoError(u64, String),
    Closed(u64),
    ReconnectTimer(u64),
}

// ── ConnectionManager ────────────────────────────────────────────

/// Owns one TCP connection and its receive buffer.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: LinkState,
    recv_buf: BytesMut,
    attempts: u32,
    auto_reconnect: bool,
    last_error: Option<String>,
    /// Bumped on every dial and teardown; stale task reports and
    /// timer callbacks carry an older value and are dropped.
    epoch: u64,
    writer: Option<mpsc::UnboundedSender<Vec<u8>>>,
    reader_task: Option<JoinHandle<()>>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    pending: VecDeque<ConnectionEvent>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let auto_reconnect = config.auto_reconnect;
        Self {
            config,
            state: LinkState::Disconnected,
            recv_buf: BytesMut::new(),
            attempts: 0,
            auto_reconnect,
            last_error: None,
            epoch: 0,
            writer: None,
            reader_task: None,
            internal_tx,
            internal_rx,
            pending: VecDeque::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Start a dial toward the configured target. Returns
    /// immediately; the outcome arrives as a [`ConnectionEvent`].
    ///
    /// Valid from `Disconnected` and `Error`. Re-enables
    /// auto-reconnect per the configuration and zeroes the attempt
    /// counter.
    pub fn connect(&mut self) -> Result<(), WireError> {
        match self.state {
            LinkState::Disconnected | LinkState::Error => {}
            _ => {
                return Err(WireError::InvalidTransition(
                    "connect requires Disconnected or Error",
                ));
            }
        }
        self.auto_reconnect = self.config.auto_reconnect;
        self.attempts = 0;
        self.begin_dial();
        Ok(())
    }

    /// Tear down the connection from any state. Explicit disconnects
    /// are never retried: auto-reconnect is disabled until the next
    /// `connect` call, and any armed reconnect timer is invalidated.
    pub fn disconnect(&mut self) {
        self.epoch += 1;
        self.auto_reconnect = false;
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
        self.writer = None;
        self.recv_buf.clear();
        if self.state != LinkState::Disconnected {
            self.state = LinkState::Disconnected;
            self.pending.push_back(ConnectionEvent::Disconnected);
        }
    }

    /// Encode and send one message. Returns `false` (with the last
    /// error set) when not connected or when the writer has gone
    /// away; never blocks beyond handing the frame to the writer
    /// task, which performs the actual `write_all`.
    pub fn send(&mut self, kind: MessageKind, json: Map<String, Value>, bin: &[u8]) -> bool {
        if self.state != LinkState::Connected {
            self.last_error = Some("send failed: not connected".into());
            return false;
        }
        let frame = match packet::encode_frame(kind.code(), &json, bin) {
            Ok(frame) => frame,
            Err(e) => {
                self.last_error = Some(format!("send failed: {e}"));
                return false;
            }
        };
        match &self.writer {
            Some(writer) if writer.send(frame).is_ok() => true,
            _ => {
                self.last_error = Some("send failed: writer closed".into());
                false
            }
        }
    }

    /// Await the next event, pumping internal task reports as they
    /// arrive. Cancellation-safe: suitable for `tokio::select!`.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return event;
            }
            // `internal_tx` lives inside self, so the channel can
            // never close underneath us.
            if let Some(internal) = self.internal_rx.recv().await {
                self.dispatch(internal);
            }
        }
    }

    // ── Internal dispatch ────────────────────────────────────────

    fn dispatch(&mut self, internal: Internal) {
        match internal {
            Internal::DialOk(epoch, stream) => {
                if epoch != self.epoch || self.state != LinkState::Connecting {
                    return; // stale dial; dropping the stream closes it
                }
                self.install_stream(stream);
                self.on_socket_connected();
            }
            Internal::DialFailed(epoch, error) => {
                if epoch != self.epoch || self.state != LinkState::Connecting {
                    return;
                }
                self.on_socket_error(error);
            }
            Internal::Bytes(epoch, data) => {
                if epoch == self.epoch {
                    self.on_bytes(&data);
                }
            }
            Internal::IoError(epoch, error) => {
                if epoch == self.epoch {
                    self.on_socket_error(error);
                }
            }
            Internal::Closed(epoch) => {
                if epoch != self.epoch {
                    return;
                }
                if let Some(delay) = self.on_socket_closed() {
                    self.arm_reconnect_timer(delay);
                }
            }
            Internal::ReconnectTimer(epoch) => {
                if epoch == self.epoch && self.state == LinkState::Reconnecting {
                    debug!(attempt = self.attempts, "reconnect timer fired");
                    self.begin_dial();
                }
            }
        }
    }

    fn begin_dial(&mut self) {
        self.epoch += 1;
        self.state = LinkState::Connecting;
        let epoch = self.epoch;
        let addr = self.config.addr();
        let tx = self.internal_tx.clone();
        debug!(%addr, "dialing");
        tokio::spawn(async move {
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    let _ = tx.send(Internal::DialOk(epoch, stream));
                }
                Err(e) => {
                    let _ = tx.send(Internal::DialFailed(epoch, e.to_string()));
                }
            }
        });
    }

    fn install_stream(&mut self, stream: TcpStream) {
        let epoch = self.epoch;
        let (mut read_half, mut write_half) = stream.into_split();

        // Writer task: drains outbound frames. `write_all` either
        // accepts the full byte count or errors.
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = writer_rx.recv().await {
                if let Err(e) = write_half.write_all(&frame).await {
                    let _ = tx.send(Internal::IoError(epoch, e.to_string()));
                    break;
                }
            }
        });

        // Reader task: the sole source of `Closed` for this epoch.
        let tx = self.internal_tx.clone();
        let reader = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match read_half.read(&mut chunk).await {
                    Ok(0) => {
                        let _ = tx.send(Internal::Closed(epoch));
                        break;
                    }
                    Ok(n) => {
                        let _ = tx.send(Internal::Bytes(epoch, chunk[..n].to_vec()));
                    }
                    Err(e) => {
                        let _ = tx.send(Internal::IoError(epoch, e.to_string()));
                        let _ = tx.send(Internal::Closed(epoch));
                        break;
                    }
                }
            }
        });

        self.writer = Some(writer_tx);
        self.reader_task = Some(reader);
    }

    fn arm_reconnect_timer(&mut self, delay: Duration) {
        let epoch = self.epoch;
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Internal::ReconnectTimer(epoch));
        });
    }

    // ── Transitions ──────────────────────────────────────────────
    //
    // Synchronous and free of I/O so the state machine can be
    // exercised without sockets.

    fn on_socket_connected(&mut self) {
        self.state = LinkState::Connected;
        self.attempts = 0;
        self.last_error = None;
        self.pending.push_back(ConnectionEvent::Connected);
    }

    /// Handle the socket going away. Returns the delay to wait before
    /// the next dial when a reconnect should be armed.
    fn on_socket_closed(&mut self) -> Option<Duration> {
        match self.state {
            // `Error` is included: transport failures surface as an
            // error followed by the close, and reconnection is driven
            // by the close.
            LinkState::Connected | LinkState::Reconnecting | LinkState::Error => {}
            _ => return None,
        }
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
        self.writer = None;
        // A partial frame from the dead connection must not prefix
        // the next connection's stream.
        self.recv_buf.clear();
        self.state = LinkState::Disconnected;
        self.pending.push_back(ConnectionEvent::Disconnected);

        if !self.auto_reconnect {
            return None;
        }
        if self.attempts < MAX_RECONNECT_ATTEMPTS {
            self.attempts += 1;
            self.state = LinkState::Reconnecting;
            let delay = Duration::from_millis(self.config.reconnect_interval_ms);
            self.pending.push_back(ConnectionEvent::Reconnecting {
                attempt: self.attempts,
                delay,
            });
            Some(delay)
        } else {
            self.auto_reconnect = false;
            self.pending.push_back(ConnectionEvent::ReconnectsExhausted);
            None
        }
    }

    fn on_socket_error(&mut self, error: String) {
        warn!(%error, "transport error");
        self.last_error = Some(error.clone());
        self.state = LinkState::Error;
        self.pending
            .push_back(ConnectionEvent::ConnectionError(error));
    }

    /// Append freshly read bytes, drain complete frames, and emit a
    /// message event per packet that passes catalog validation.
    /// Invalid packets are logged and dropped.
    fn on_bytes(&mut self, data: &[u8]) {
        self.recv_buf.extend_from_slice(data);
        let drained = packet::drain(&mut self.recv_buf);

        if drained.corrupted {
            let error = "framing corrupted; receive buffer discarded".to_string();
            self.last_error = Some(error.clone());
            self.pending
                .push_back(ConnectionEvent::ConnectionError(error));
        }

        for pkt in drained.packets {
            let (code, json, bin) = pkt.into_parts();
            let kind = match MessageKind::try_from(code) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(error = %e, "dropping packet of unknown kind");
                    continue;
                }
            };
            if let Err(e) = schema::validate(kind, &json) {
                warn!(%kind, error = %e, "dropping invalid packet");
                continue;
            }
            self.pending
                .push_back(ConnectionEvent::Message { kind, json, bin });
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
