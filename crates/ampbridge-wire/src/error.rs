/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload exceeds the configured maximum size. On decode this means
    /// the header's length field is implausible and the scanner will
    /// resynchronize on the next start sequence.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload's additive checksum does not match the header.
    ///
    /// Only raised when verification is explicitly enabled; deployed firmware
    /// is known to emit garbage checksums.
    #[error("checksum mismatch (header {header:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { header: u32, computed: u32 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
