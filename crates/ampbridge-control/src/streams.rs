//! Typed notification streams.
//!
//! The device pushes unsolicited `AXX+` frames whenever its state changes.
//! Each stream registers a persistent listener and a forwarding task that
//! parses raw frames into typed events. Delivery is best effort end to end:
//! a subscriber that falls behind misses events rather than stalling the
//! connection. Dropping the returned receiver ends the forwarding task and
//! removes the registration.

use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use ampbridge_transport::AsyncLine;
use ampbridge_wire::command;

use crate::media::MediaControl;

/// Buffer depth for subscription channels, raw and typed alike.
const STREAM_BUFFER: usize = 8;

/// Register a persistent listener under `key` and forward parsed events
/// until the subscriber goes away or the raw channel closes.
pub(crate) fn forward_stream<T, E, F>(transport: &T, key: &'static str, parse: F) -> mpsc::Receiver<E>
where
    T: AsyncLine,
    E: Send + 'static,
    F: Fn(&Bytes) -> Option<E> + Send + 'static,
{
    let (raw_tx, mut raw_rx) = mpsc::channel(STREAM_BUFFER);
    let (event_tx, event_rx) = mpsc::channel(STREAM_BUFFER);
    transport.register_persistent(key, raw_tx.clone());

    let transport = transport.clone();
    tokio::spawn(async move {
        loop {
            let payload = tokio::select! {
                _ = event_tx.closed() => break,
                received = raw_rx.recv() => match received {
                    Some(payload) => payload,
                    None => break,
                },
            };
            let Some(event) = parse(&payload) else {
                warn!(
                    key,
                    payload = %String::from_utf8_lossy(&payload),
                    "unparseable notification"
                );
                continue;
            };
            if event_tx.try_send(event).is_err() {
                trace!(key, "subscriber busy, event dropped");
            }
        }
        transport.unregister_persistent(key, &raw_tx);
    });

    event_rx
}

/// Track information pushed alongside media changes. Text fields arrive
/// hex-encoded on the wire and are decoded here.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub vendor: String,
    pub skiplimit: i32,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    skiplimit: i32,
}

impl<T: AsyncLine<Message = String>> MediaControl<T> {
    /// Volume changes as fractions of full scale.
    pub fn volume_updates(&self) -> mpsc::Receiver<f32> {
        forward_stream(&self.transport, "AXX+VOL+", |payload| {
            let text = std::str::from_utf8(payload).ok()?;
            let param = command::notify_param(text, "AXX+VOL+")?;
            let level: u32 = param.parse().ok()?;
            Some(level as f32 / 100.0)
        })
    }

    pub fn mute_updates(&self) -> mpsc::Receiver<bool> {
        forward_stream(&self.transport, "AXX+MUT+", |payload| {
            let text = std::str::from_utf8(payload).ok()?;
            let param = command::notify_param(text, "AXX+MUT+")?;
            Some(param == "1")
        })
    }

    /// Whether the device reports itself playing.
    pub fn play_state_updates(&self) -> mpsc::Receiver<bool> {
        forward_stream(&self.transport, "AXX+PLY+", |payload| {
            let text = std::str::from_utf8(payload).ok()?;
            let param = command::notify_param(text, "AXX+PLY+")?;
            Some(param == "1")
        })
    }

    /// Fires when the device reports new media is ready to play. The frame
    /// carries no data; arrival is the event.
    pub fn media_ready(&self) -> mpsc::Receiver<()> {
        forward_stream(&self.transport, "AXX+MEA+RDY", |_| Some(()))
    }

    /// Track metadata changes, e.g. `AXX+MEA+DAT{"title":"4142",...}&`.
    pub fn metadata_updates(&self) -> mpsc::Receiver<TrackMetadata> {
        forward_stream(&self.transport, "AXX+MEA+DAT", |payload| {
            let text = std::str::from_utf8(payload).ok()?;
            let json = command::notify_param(text, "AXX+MEA+DAT")?;
            let raw: RawMetadata = serde_json::from_str(json).ok()?;
            Some(TrackMetadata {
                title: decode_hex_text(&raw.title),
                artist: decode_hex_text(&raw.artist),
                album: decode_hex_text(&raw.album),
                vendor: decode_hex_text(&raw.vendor),
                skiplimit: raw.skiplimit,
            })
        })
    }
}

/// Decode a hex-encoded UTF-8 string, passing the input through unchanged
/// when it isn't valid hex. Older firmware sends some fields as plain text.
fn decode_hex_text(text: &str) -> String {
    if text.is_empty() || text.len() % 2 != 0 {
        return text.to_string();
    }
    // Works on raw bytes: plain-text fields may hold multi-byte characters,
    // where slicing the str at pair boundaries would panic.
    let mut bytes = Vec::with_capacity(text.len() / 2);
    for pair in text.as_bytes().chunks_exact(2) {
        match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(hi), Some(lo)) => bytes.push(hi << 4 | lo),
            _ => return text.to_string(),
        }
    }
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockLine;
    use ampbridge_transport::Flavor;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_volume_updates_scale_to_fraction() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());
        let mut updates = control.volume_updates();

        for level in [10, 20, 30] {
            transport.inject(&format!("AXX+VOL+{level}&"));
        }

        assert_eq!(timeout(WAIT, updates.recv()).await.unwrap(), Some(0.10));
        assert_eq!(timeout(WAIT, updates.recv()).await.unwrap(), Some(0.20));
        assert_eq!(timeout(WAIT, updates.recv()).await.unwrap(), Some(0.30));
    }

    #[tokio::test]
    async fn test_malformed_notifications_are_skipped() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());
        let mut updates = control.volume_updates();

        transport.inject("AXX+VOL+notanumber&");
        transport.inject("AXX+VOL+55&");

        assert_eq!(timeout(WAIT, updates.recv()).await.unwrap(), Some(0.55));
    }

    #[tokio::test]
    async fn test_metadata_fields_are_hex_decoded() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());
        let mut updates = control.metadata_updates();

        // "AB" / "CD" / "EF" hex-encoded, vendor in plain text.
        transport.inject(
            r#"AXX+MEA+DAT{"title":"4142","artist":"4344","album":"4546","vendor":"Airplay","skiplimit":6}&"#,
        );

        let metadata = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
        assert_eq!(metadata.title, "AB");
        assert_eq!(metadata.artist, "CD");
        assert_eq!(metadata.album, "EF");
        assert_eq!(metadata.vendor, "Airplay");
        assert_eq!(metadata.skiplimit, 6);
    }

    #[tokio::test]
    async fn test_media_ready_fires_per_frame() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());
        let mut ready = control.media_ready();

        transport.inject("AXX+MEA+RDY&");
        assert_eq!(timeout(WAIT, ready.recv()).await.unwrap(), Some(()));
    }

    #[tokio::test]
    async fn test_dropping_receiver_removes_registration() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());

        let updates = control.mute_updates();
        assert_eq!(transport.listener_count(), 1);
        drop(updates);

        // The forwarding task notices the closed receiver and unregisters.
        let cleaned = async {
            while transport.listener_count() != 0 {
                tokio::task::yield_now().await;
            }
        };
        timeout(WAIT, cleaned).await.unwrap();
    }

    #[test]
    fn test_decode_hex_text_fallbacks() {
        assert_eq!(decode_hex_text("4142"), "AB");
        assert_eq!(decode_hex_text(""), "");
        assert_eq!(decode_hex_text("odd"), "odd");
        assert_eq!(decode_hex_text("Airplay"), "Airplay");
    }

    #[test]
    fn test_decode_hex_text_passes_non_ascii_through() {
        // Even byte lengths whose pair boundaries fall inside characters.
        assert_eq!(decode_hex_text("日本"), "日本");
        assert_eq!(decode_hex_text("déjà"), "déjà");
    }

    #[tokio::test]
    async fn test_metadata_with_plain_text_fields_still_flows() {
        let transport: MockLine<String> = MockLine::new(Flavor::LineTcp);
        let control = MediaControl::new(transport.clone());
        let mut updates = control.metadata_updates();

        transport.inject(
            r#"AXX+MEA+DAT{"title":"4142","artist":"日本","album":"","vendor":"Airplay","skiplimit":-1}&"#,
        );

        let metadata = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
        assert_eq!(metadata.title, "AB");
        assert_eq!(metadata.artist, "日本");
        assert_eq!(metadata.album, "");
        assert_eq!(metadata.skiplimit, -1);
    }
}
