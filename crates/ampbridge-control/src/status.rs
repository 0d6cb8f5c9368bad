//! Status operations for devices on the websocket firmware line.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use ampbridge_transport::{
    request_with_reply_coalescing, AsyncLine, Flavor, WsMessage, DEFAULT_REPLY_TIMEOUT,
};

use crate::error::{ControlError, Result};
use crate::streams::forward_stream;

/// The status summary a websocket device pushes and answers queries with.
///
/// The wire nests track and metadata objects; this type flattens them into
/// one record and unescapes the HTML entities the firmware leaves in text
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DeviceStatus {
    pub input: String,
    pub source: String,
    pub state: String,
    pub index: i32,
    pub mode: String,
    pub elapsed: i64,
    pub duration: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub image: String,
    pub volume: i32,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    input: String,
    #[serde(default)]
    vol: i32,
    #[serde(default)]
    track: RawTrack,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrack {
    #[serde(default)]
    source: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    index: i32,
    #[serde(default)]
    mode: String,
    #[serde(default)]
    elapsed: i64,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    meta: RawMeta,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    image: String,
}

impl RawStatus {
    fn normalize(self) -> DeviceStatus {
        DeviceStatus {
            input: self.input,
            source: self.track.source,
            state: self.track.state,
            index: self.track.index,
            mode: self.track.mode,
            elapsed: self.track.elapsed,
            duration: self.track.duration,
            title: unescape_html(&self.track.meta.title),
            artist: unescape_html(&self.track.meta.artist),
            album: unescape_html(&self.track.meta.album),
            image: self.track.meta.image,
            volume: self.vol,
        }
    }
}

/// Status queries and subscriptions over a websocket-flavored connection.
#[derive(Debug, Clone)]
pub struct StatusControl<T> {
    transport: T,
    reply_timeout: Duration,
}

impl<T: AsyncLine<Message = WsMessage>> StatusControl<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn ensure_websocket(&self) -> Result<()> {
        match self.transport.flavor() {
            Flavor::Websocket => Ok(()),
            other => Err(ControlError::UnsupportedFlavor(other)),
        }
    }

    /// Query the device's current status.
    ///
    /// Replies are routed by `cmd == "STATUS"`; concurrent queries coalesce
    /// onto one wire request, since the firmware answers a repeated query
    /// only once.
    pub async fn status(&self) -> Result<DeviceStatus> {
        self.ensure_websocket()?;
        let reply = request_with_reply_coalescing(
            &self.transport,
            WsMessage::Text("#CMD:STATUS".to_string()),
            "STATUS",
            self.reply_timeout,
        )
        .await?;
        let raw: RawStatus = serde_json::from_slice(&reply)?;
        Ok(raw.normalize())
    }

    /// Every status push the device makes, normalized. Dropping the receiver
    /// ends the subscription.
    pub fn status_updates(&self) -> mpsc::Receiver<DeviceStatus> {
        forward_stream(&self.transport, "STATUS", |payload| {
            let raw: RawStatus = serde_json::from_slice(payload).ok()?;
            Some(raw.normalize())
        })
    }
}

/// Undo the HTML entity escaping the firmware applies to text fields.
fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
