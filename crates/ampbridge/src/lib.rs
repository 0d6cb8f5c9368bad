//! Broker for networked audio streamer devices.
//!
//! ampbridge keeps live connections to devices speaking a vendor ASCII/binary
//! hybrid protocol and exposes them as a typed Rust surface.
//!
//! # Crate Structure
//!
//! - [`wire`] — Frame codec, command text, and websocket envelope
//! - [`transport`] — Multiplexed connections (TCP line, websocket, HTTP polling)
//! - [`control`] — Typed device operations and notification streams

/// Re-export wire types.
pub mod wire {
    pub use ampbridge_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use ampbridge_transport::*;
}

/// Re-export control types.
pub mod control {
    pub use ampbridge_control::*;
}
