use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::flavor::Flavor;
use crate::registry::{ListenerRegistry, MatchMode};
use crate::traits::AsyncLine;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_IDLE: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An outbound websocket payload.
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Raw command text, e.g. `#CMD:STATUS`.
    Text(String),
    /// A JSON value, serialized before sending.
    Json(serde_json::Value),
}

impl WsMessage {
    fn into_wire(self) -> Result<Message> {
        match self {
            WsMessage::Text(text) => Ok(Message::Text(text)),
            WsMessage::Json(value) => {
                let text = serde_json::to_string(&value).map_err(|err| {
                    TransportError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        err,
                    ))
                })?;
                Ok(Message::Text(text))
            }
        }
    }
}

#[derive(Debug)]
struct AtomicSend {
    message: WsMessage,
    reply_key: String,
    reply_tx: mpsc::Sender<Bytes>,
}

#[derive(Debug)]
struct Shared {
    registry: ListenerRegistry,
    conn: Mutex<Option<Conn>>,
}

#[derive(Debug)]
struct Conn {
    target: String,
    outgoing: mpsc::Sender<WsMessage>,
    atomic: mpsc::Sender<AtomicSend>,
    shutdown: CancellationToken,
}

/// Websocket transport for devices on the JSON firmware line.
///
/// Inbound messages are routed by their JSON `cmd` member (exact match); the
/// binary framing of [`crate::LineTransport`] does not apply. Unlike the line
/// flavor, the firmware accepts back-to-back writes, so sends are not spaced.
#[derive(Debug, Clone)]
pub struct WsTransport {
    shared: Arc<Shared>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: ListenerRegistry::new(MatchMode::Exact),
                conn: Mutex::new(None),
            }),
        }
    }

    fn lock_conn(&self) -> MutexGuard<'_, Option<Conn>> {
        self.shared
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncLine for WsTransport {
    type Message = WsMessage;

    fn flavor(&self) -> Flavor {
        Flavor::Websocket
    }

    fn target(&self) -> Option<String> {
        self.lock_conn().as_ref().map(|conn| conn.target.clone())
    }

    async fn connect(&self, target: &str) -> Result<()> {
        self.close().await?;

        let handshake = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(target))
            .await
            .map_err(|_| TransportError::Connect {
                target: target.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "handshake timed out"),
            })?;
        let (stream, _response) = handshake.map_err(|err| TransportError::Handshake {
            target: target.to_string(),
            source: Box::new(err),
        })?;
        let (sink, source) = stream.split();

        let (outgoing_tx, outgoing_rx) = mpsc::channel(1);
        let (atomic_tx, atomic_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        tokio::spawn(read_loop(source, Arc::clone(&self.shared), shutdown.clone()));
        tokio::spawn(write_loop(
            sink,
            Arc::clone(&self.shared),
            outgoing_rx,
            atomic_rx,
            shutdown.clone(),
        ));

        *self.lock_conn() = Some(Conn {
            target: target.to_string(),
            outgoing: outgoing_tx,
            atomic: atomic_tx,
            shutdown,
        });
        info!(target, "websocket transport connected");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.lock_conn().take() {
            conn.shutdown.cancel();
            debug!(target = %conn.target, "websocket transport closed");
        }
        Ok(())
    }

    async fn send(&self, message: WsMessage) -> Result<()> {
        let outgoing = self
            .lock_conn()
            .as_ref()
            .map(|conn| conn.outgoing.clone())
            .ok_or(TransportError::NotConnected)?;
        outgoing
            .send(message)
            .await
            .map_err(|_| TransportError::NotConnected)
    }

    async fn send_atomic(
        &self,
        message: WsMessage,
        reply_key: &str,
        reply_tx: mpsc::Sender<Bytes>,
    ) -> Result<()> {
        let atomic = self
            .lock_conn()
            .as_ref()
            .map(|conn| conn.atomic.clone())
            .ok_or(TransportError::NotConnected)?;
        atomic
            .send(AtomicSend {
                message,
                reply_key: reply_key.to_string(),
                reply_tx,
            })
            .await
            .map_err(|_| TransportError::NotConnected)
    }

    fn register_persistent(&self, key: &str, tx: mpsc::Sender<Bytes>) {
        self.shared.registry.register_persistent(key, tx);
    }

    fn unregister_persistent(&self, key: &str, tx: &mpsc::Sender<Bytes>) {
        self.shared.registry.unregister_persistent(key, tx);
    }

    fn register_oneshot(&self, key: &str, tx: mpsc::Sender<Bytes>) -> bool {
        self.shared.registry.register_oneshot(key, tx)
    }

    fn remove_oneshot(&self, key: &str, tx: &mpsc::Sender<Bytes>) {
        self.shared.registry.remove_oneshot(key, tx)
    }
}

async fn read_loop(mut source: SplitStream<WsStream>, shared: Arc<Shared>, shutdown: CancellationToken) {
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = tokio::time::timeout(READ_IDLE, source.next()) => polled,
        };
        let message = match next {
            Err(_) => continue, // idle line
            Ok(None) => {
                debug!("device closed the websocket");
                break;
            }
            Ok(Some(Err(err))) => {
                warn!(error = %err, "websocket read failed");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };
        let payload = match message {
            Message::Text(text) => Bytes::from(text.into_bytes()),
            Message::Close(_) => {
                debug!("close frame received");
                break;
            }
            // Ping/pong are answered by the library; binary frames are not
            // part of this protocol.
            _ => continue,
        };
        match ampbridge_wire::match_key(&payload) {
            Some(cmd) => {
                trace!(cmd = %cmd, "message received");
                shared.registry.dispatch(&cmd, &payload);
            }
            None => {
                warn!(
                    payload = %String::from_utf8_lossy(&payload),
                    "unroutable message"
                );
            }
        }
    }
    shutdown.cancel();
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    shared: Arc<Shared>,
    mut outgoing: mpsc::Receiver<WsMessage>,
    mut atomic: mpsc::Receiver<AtomicSend>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            queued = atomic.recv() => match queued {
                Some(AtomicSend { message, reply_key, reply_tx }) => {
                    // The requester may have given up while the send sat
                    // queued; registering its dead channel would make later
                    // requests under this key look coalesced.
                    if reply_tx.is_closed() {
                        trace!(key = %reply_key, "requester gone, queued request dropped");
                        continue;
                    }
                    // Register before the write so the reply cannot win the race.
                    shared.registry.register_oneshot(reply_key, reply_tx);
                    message
                }
                None => break,
            },
            queued = outgoing.recv() => match queued {
                Some(message) => message,
                None => break,
            },
        };
        let frame = match message.into_wire() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "unserializable message dropped");
                continue;
            }
        };
        trace!("sending websocket message");
        if let Err(err) = sink.send(frame).await {
            warn!(error = %err, "websocket write failed");
        }
    }
}
