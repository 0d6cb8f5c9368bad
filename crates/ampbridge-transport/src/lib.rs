//! Multiplexed async transports for networked audio streamers.
//!
//! A device connection carries concurrent request/response exchanges and
//! long-lived notification subscriptions over one socket. Each transport
//! flavor pairs a background reader (deframes and fans out to listeners)
//! with a background writer (serializes sends); callers interact only
//! through the [`AsyncLine`] contract and the request helpers.

pub mod error;
pub mod flavor;
pub mod http;
pub mod line;
pub mod registry;
pub mod request;
pub mod traits;
pub mod websocket;

pub use error::{Result, TransportError};
pub use flavor::Flavor;
pub use http::HttpTransport;
pub use line::LineTransport;
pub use registry::{ListenerRegistry, MatchMode};
pub use request::{request_with_reply, request_with_reply_coalescing, DEFAULT_REPLY_TIMEOUT};
pub use traits::AsyncLine;
pub use websocket::{WsMessage, WsTransport};
