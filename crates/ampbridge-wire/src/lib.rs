//! Wire protocol for networked audio streamer modules.
//!
//! Devices speak a short ASCII command protocol. On the TCP firmware line
//! every command travels inside a light binary frame:
//! - a 4-byte start sequence (`0x18 0x96 0x18 0x20`) for stream synchronization
//! - a 4-byte little-endian payload length
//! - a 4-byte little-endian additive checksum (computed, but historically
//!   never verified by either end)
//! - 8 reserved zero bytes
//!
//! The websocket firmware line skips the binary frame and routes JSON text
//! messages by their `cmd` member instead.

pub mod codec;
pub mod command;
pub mod envelope;
pub mod error;

pub use codec::{
    checksum, decode_frame, encode_frame, LineCodec, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC,
};
pub use envelope::match_key;
pub use error::{Result, WireError};
