//! Request/response helpers over a multiplexed transport.
//!
//! Commands on these connections are answered under a known reply key, so a
//! request is: register a one-shot listener for that key, send, wait. The
//! helpers here do the three steps with the registration removed on every
//! exit path, including the caller giving up early.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::AsyncLine;

/// Default time to wait for a device to answer a request.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Send `request` and wait up to `wait` for the reply registered under
/// `reply_key`.
///
/// Registration uses the transport's atomic path, so the listener is in
/// place before the request reaches the wire. Cancelling (dropping) the
/// returned future or timing out never leaves a stale registration behind.
pub async fn request_with_reply<T: AsyncLine>(
    transport: &T,
    request: T::Message,
    reply_key: &str,
    wait: Duration,
) -> Result<Bytes> {
    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    let _cleanup = OneshotCleanup {
        transport,
        key: reply_key,
        tx: reply_tx.clone(),
    };
    transport.send_atomic(request, reply_key, reply_tx).await?;
    await_reply(&mut reply_rx, wait).await
}

/// Like [`request_with_reply`], but skips the send when another caller is
/// already waiting under the same reply key; both then share the device's
/// single answer. Used on firmware that answers repeated queries only once.
pub async fn request_with_reply_coalescing<T: AsyncLine>(
    transport: &T,
    request: T::Message,
    reply_key: &str,
    wait: Duration,
) -> Result<Bytes> {
    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    let already_waiting = transport.register_oneshot(reply_key, reply_tx.clone());
    let _cleanup = OneshotCleanup {
        transport,
        key: reply_key,
        tx: reply_tx,
    };
    if !already_waiting {
        transport.send(request).await?;
    }
    await_reply(&mut reply_rx, wait).await
}

async fn await_reply(reply_rx: &mut mpsc::Receiver<Bytes>, wait: Duration) -> Result<Bytes> {
    match tokio::time::timeout(wait, reply_rx.recv()).await {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => Err(TransportError::ConnectionClosed),
        Err(_) => Err(TransportError::Timeout),
    }
}

/// Removes a one-shot registration on drop. Removal after a delivered reply
/// is a no-op, since dispatch already consumed the entry.
struct OneshotCleanup<'a, T: AsyncLine> {
    transport: &'a T,
    key: &'a str,
    tx: mpsc::Sender<Bytes>,
}

impl<T: AsyncLine> Drop for OneshotCleanup<'_, T> {
    fn drop(&mut self) {
        self.transport.remove_oneshot(self.key, &self.tx);
    }
}
