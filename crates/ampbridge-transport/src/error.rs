/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The operation needs a live connection and there is none.
    #[error("transport not connected")]
    NotConnected,

    /// Failed to establish a connection to the device.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// The websocket handshake with the device failed.
    #[error("websocket handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    /// The dial target could not be parsed.
    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The device did not answer within the allowed time.
    #[error("timed out waiting for the device")]
    Timeout,

    /// The connection closed while an operation was in flight.
    #[error("connection closed")]
    ConnectionClosed,

    /// A framing error on the wire.
    #[error(transparent)]
    Wire(#[from] ampbridge_wire::WireError),

    /// An HTTP polling request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
