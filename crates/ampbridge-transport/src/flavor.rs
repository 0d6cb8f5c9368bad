use std::fmt;

/// The protocol variant a transport speaks.
///
/// Commands take different forms between connection types, so layers above
/// the transport use this to pick the right vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Binary-framed ASCII commands over a TCP tunnel to the device's
    /// network module.
    LineTcp,
    /// JSON text messages over a websocket.
    Websocket,
    /// Stateless HTTP polling against the device's web endpoint.
    HttpPolling,
}

impl Flavor {
    /// Flavor name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::LineTcp => "line-tcp",
            Flavor::Websocket => "websocket",
            Flavor::HttpPolling => "http-polling",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
