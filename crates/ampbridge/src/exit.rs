use std::fmt;
use std::io;

use ampbridge_control::ControlError;
use ampbridge_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        TransportError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::NotConnected | TransportError::ConnectionClosed => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        TransportError::InvalidTarget { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn control_error(context: &str, err: ControlError) -> CliError {
    match err {
        ControlError::Transport(err) => transport_error(context, err),
        ControlError::UnsupportedFlavor(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ControlError::NoMatch { .. } | ControlError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ampbridge_transport::Flavor;

    #[test]
    fn timeout_maps_to_timeout_code() {
        let err = transport_error("query failed", TransportError::Timeout);
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn unsupported_flavor_is_a_usage_error() {
        let err = control_error(
            "volume failed",
            ControlError::UnsupportedFlavor(Flavor::Websocket),
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn nested_transport_error_uses_transport_mapping() {
        let err = control_error(
            "volume failed",
            ControlError::Transport(TransportError::Timeout),
        );
        assert_eq!(err.code, TIMEOUT);
    }
}
