use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;

/// How listener keys are matched against inbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The key must be a prefix of the frame text (line-protocol replies,
    /// e.g. key `MCU+PAS+RAKOIT:VOL:`). The empty key matches every frame.
    Prefix,
    /// The key must equal the frame's routing key exactly (websocket `cmd`).
    Exact,
}

/// Fan-out table mapping reply keys to waiting listeners.
///
/// Two namespaces share one lock: persistent listeners receive every matching
/// frame until unregistered, one-shot listeners are consumed by the first
/// matching frame. Delivery is best effort via `try_send`: a listener whose
/// buffer is full misses that frame, and a listener whose receiver was
/// dropped is pruned. A slow subscriber therefore loses frames instead of
/// stalling the reader.
#[derive(Debug)]
pub struct ListenerRegistry {
    mode: MatchMode,
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    persistent: HashMap<String, Vec<mpsc::Sender<Bytes>>>,
    oneshot: HashMap<String, Vec<mpsc::Sender<Bytes>>>,
}

impl ListenerRegistry {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener for every frame matching `key`.
    pub fn register_persistent(&self, key: impl Into<String>, tx: mpsc::Sender<Bytes>) {
        self.lock().persistent.entry(key.into()).or_default().push(tx);
    }

    /// Remove a persistent registration. The channel identifies the entry:
    /// only the listener registered with this exact channel is removed.
    pub fn unregister_persistent(&self, key: &str, tx: &mpsc::Sender<Bytes>) {
        let mut tables = self.lock();
        if let Some(entries) = tables.persistent.get_mut(key) {
            entries.retain(|entry| !entry.same_channel(tx));
            if entries.is_empty() {
                tables.persistent.remove(key);
            }
        }
    }

    /// Register a listener for the first frame matching `key`.
    ///
    /// Returns whether at least one one-shot listener was already waiting
    /// under the same key, so callers can avoid re-sending a request that is
    /// already in flight.
    pub fn register_oneshot(&self, key: impl Into<String>, tx: mpsc::Sender<Bytes>) -> bool {
        let mut tables = self.lock();
        let entries = tables.oneshot.entry(key.into()).or_default();
        let already_waiting = !entries.is_empty();
        entries.push(tx);
        already_waiting
    }

    /// Remove a one-shot registration that will no longer be awaited.
    pub fn remove_oneshot(&self, key: &str, tx: &mpsc::Sender<Bytes>) {
        let mut tables = self.lock();
        if let Some(entries) = tables.oneshot.get_mut(key) {
            entries.retain(|entry| !entry.same_channel(tx));
            if entries.is_empty() {
                tables.oneshot.remove(key);
            }
        }
    }

    /// Fan a frame out to every matching listener.
    ///
    /// `key` is the routing key derived from the frame: the frame text itself
    /// under prefix matching, the JSON `cmd` member under exact matching.
    /// One-shot entries for a matched key are dropped after the scan whether
    /// or not any delivery landed.
    pub fn dispatch(&self, key: &str, payload: &Bytes) {
        let mode = self.mode;
        let mut tables = self.lock();

        tables.persistent.retain(|registered, entries| {
            if !matches(mode, registered, key) {
                return true;
            }
            entries.retain(|tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow subscriber; it stays registered and skips this frame.
                    trace!(key = %registered, "listener buffer full, frame skipped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
            !entries.is_empty()
        });

        tables.oneshot.retain(|registered, entries| {
            if !matches(mode, registered, key) {
                return true;
            }
            for tx in entries.drain(..) {
                if tx.try_send(payload.clone()).is_err() {
                    trace!(key = %registered, "one-shot listener gone, reply dropped");
                }
            }
            false
        });
    }

    /// Number of live registrations across both namespaces, for diagnostics.
    pub fn len(&self) -> usize {
        let tables = self.lock();
        let persistent: usize = tables.persistent.values().map(Vec::len).sum();
        let oneshot: usize = tables.oneshot.values().map(Vec::len).sum();
        persistent + oneshot
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches(mode: MatchMode, registered: &str, key: &str) -> bool {
    match mode {
        MatchMode::Prefix => key.starts_with(registered),
        MatchMode::Exact => registered == key,
    }
}
