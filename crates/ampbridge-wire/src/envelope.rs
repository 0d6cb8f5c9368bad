//! Routing-key extraction for the websocket firmware line.
//!
//! Websocket devices skip the binary framing entirely and exchange JSON text
//! messages. Every routable message carries a `cmd` member naming the command
//! it answers, e.g. `{"cmd": "STATUS", ...}`.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CommandField {
    cmd: String,
}

/// Extract the `cmd` routing key from a websocket JSON payload.
///
/// Returns `None` for payloads that are not JSON objects with a string `cmd`
/// member; such messages cannot be routed to listeners.
pub fn match_key(payload: &[u8]) -> Option<String> {
    serde_json::from_slice::<CommandField>(payload)
        .ok()
        .map(|body| body.cmd)
}
