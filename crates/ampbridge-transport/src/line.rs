use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use ampbridge_wire::{LineCodec, WireError};

use crate::error::{Result, TransportError};
use crate::flavor::Flavor;
use crate::registry::{ListenerRegistry, MatchMode};
use crate::traits::AsyncLine;

/// Dial timeout for new connections.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the reader waits for traffic before polling again. An idle
/// interval is not an error; the device is simply quiet.
const READ_IDLE: Duration = Duration::from_secs(5);

/// Minimum spacing between wire writes. The firmware drops commands that
/// arrive back to back.
const SEND_SPACING: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct Shared {
    codec: LineCodec,
    registry: ListenerRegistry,
    conn: Mutex<Option<Conn>>,
}

#[derive(Debug)]
struct Conn {
    target: String,
    outgoing: mpsc::Sender<String>,
    shutdown: CancellationToken,
}

/// Line-protocol transport: binary-framed ASCII commands over a TCP tunnel
/// to the device's network module.
///
/// Listeners live on the transport rather than the connection, so
/// registrations made before [`AsyncLine::connect`] or across a reconnect
/// keep working.
#[derive(Debug, Clone)]
pub struct LineTransport {
    shared: Arc<Shared>,
}

impl LineTransport {
    pub fn new() -> Self {
        Self::with_codec(LineCodec::new())
    }

    /// Use a tuned codec, e.g. with checksum verification enabled.
    pub fn with_codec(codec: LineCodec) -> Self {
        Self {
            shared: Arc::new(Shared {
                codec,
                registry: ListenerRegistry::new(MatchMode::Prefix),
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

impl Default for LineTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncLine for LineTransport {
    type Message = String;

    fn flavor(&self) -> Flavor {
        Flavor::LineTcp
    }

    fn target(&self) -> Option<String> {
        self.lock_conn().as_ref().map(|conn| conn.target.clone())
    }

    async fn connect(&self, target: &str) -> Result<()> {
        self.close().await?;

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(target))
            .await
            .map_err(|_| TransportError::Connect {
                target: target.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "dial timed out"),
            })?
            .map_err(|source| TransportError::Connect {
                target: target.to_string(),
                source,
            })?;

        let (read_half, write_half) = stream.into_split();
        let (outgoing_tx, outgoing_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        tokio::spawn(read_loop(
            FramedRead::new(read_half, self.shared.codec.clone()),
            Arc::clone(&self.shared),
            shutdown.clone(),
        ));
        tokio::spawn(write_loop(
            FramedWrite::new(write_half, self.shared.codec.clone()),
            outgoing_rx,
            shutdown.clone(),
        ));

        *self.lock_conn() = Some(Conn {
            target: target.to_string(),
            outgoing: outgoing_tx,
            shutdown,
        });
        info!(target, "line transport connected");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.lock_conn().take() {
            conn.shutdown.cancel();
            debug!(target = %conn.target, "line transport closed");
        }
        Ok(())
    }

    async fn send(&self, message: String) -> Result<()> {
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
        message: String,
        reply_key: &str,
        reply_tx: mpsc::Sender<Bytes>,
    ) -> Result<()> {
        // The queue preserves ordering, so registering up front is enough to
        // guarantee the listener is in place before the reply can arrive.
        self.shared
            .registry
            .register_oneshot(reply_key, reply_tx.clone());
        let sent = self.send(message).await;
        if sent.is_err() {
            self.shared.registry.remove_oneshot(reply_key, &reply_tx);
        }
        sent
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

async fn read_loop(
    mut frames: FramedRead<OwnedReadHalf, LineCodec>,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = tokio::time::timeout(READ_IDLE, frames.next()) => polled,
        };
        let payload = match next {
            Err(_) => continue, // idle line
            Ok(None) => {
                debug!("device closed the stream");
                break;
            }
            Ok(Some(Err(WireError::Io(err)))) => {
                warn!(error = %err, "read failed");
                break;
            }
            Ok(Some(Err(err))) => {
                // The codec has already resynchronized past the bad bytes.
                warn!(error = %err, "skipping malformed frame");
                continue;
            }
            Ok(Some(Ok(payload))) => payload,
        };

        let text = String::from_utf8_lossy(&payload);
        trace!(frame = %text, "frame received");
        shared.registry.dispatch(&text, &payload);
    }
    // The writer stops with the reader; later sends fail with NotConnected.
    shutdown.cancel();
}

async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, LineCodec>,
    mut outgoing: mpsc::Receiver<String>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            queued = outgoing.recv() => match queued {
                Some(message) => message,
                None => break,
            },
        };
        trace!(message = %message, "sending frame");
        if let Err(err) = sink.send(message).await {
            warn!(error = %err, "write failed");
        }
        tokio::time::sleep(SEND_SPACING).await;
    }
}
