use std::future::Future;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::flavor::Flavor;

/// A live, multiplexed connection to one device.
///
/// Commands on these connections take the form `[prefix]CMD[:PARAM]`, so the
/// general flow is: register a listener for the reply you expect, then send
/// the request. One background reader fans inbound frames out to listeners;
/// one background writer serializes outbound sends.
///
/// Implementations are cheap to clone (all clones share one connection) and
/// safe to use from multiple tasks. Futures returned by the async methods are
/// cancel-safe: dropping them abandons the operation without corrupting the
/// connection.
pub trait AsyncLine: Clone + Send + Sync + 'static {
    /// The outbound message type this protocol variant carries.
    type Message: Send + 'static;

    /// The protocol variant, for picking command vocabulary.
    fn flavor(&self) -> Flavor;

    /// The target of the current connection, if any.
    fn target(&self) -> Option<String>;

    /// Establish a connection to `target`, replacing any previous connection.
    fn connect(&self, target: &str) -> impl Future<Output = Result<()>> + Send;

    /// Tear down the current connection. Idempotent.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// Queue a message for sending. Blocks while the writer is busy; dropping
    /// the future before the queue accepts the message abandons the send.
    fn send(&self, message: Self::Message) -> impl Future<Output = Result<()>> + Send;

    /// Queue a message together with a one-shot listener for its reply. The
    /// registration is guaranteed to happen before the message reaches the
    /// wire, so a fast reply cannot slip past the listener.
    fn send_atomic(
        &self,
        message: Self::Message,
        reply_key: &str,
        reply_tx: mpsc::Sender<Bytes>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Register a listener for every frame matching `key`.
    fn register_persistent(&self, key: &str, tx: mpsc::Sender<Bytes>);

    /// Remove a persistent registration identified by its channel.
    fn unregister_persistent(&self, key: &str, tx: &mpsc::Sender<Bytes>);

    /// Register a listener for the first frame matching `key`. Returns
    /// whether another one-shot listener was already waiting under that key.
    fn register_oneshot(&self, key: &str, tx: mpsc::Sender<Bytes>) -> bool;

    /// Remove a one-shot registration that will no longer be awaited.
    fn remove_oneshot(&self, key: &str, tx: &mpsc::Sender<Bytes>);
}
