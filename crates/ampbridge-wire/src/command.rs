//! Builders and parsers for the ASCII command vocabulary.
//!
//! Requests to a device take the shape `MCU+PAS+RAKOIT:CMD[:PARAM]&` and the
//! device answers with the same prefix, e.g. `MCU+PAS+RAKOIT:VOL:50&`.
//! Unsolicited notifications arrive under the `AXX+` prefix instead.

/// Prefix for commands passed through to the device MCU.
pub const SERIAL_PREFIX: &str = "MCU+PAS+RAKOIT:";

/// Prefix of unsolicited notifications pushed by the device.
pub const NOTIFY_PREFIX: &str = "AXX+";

/// Terminator appended to every command and reply.
pub const TERMINATOR: char = '&';

/// Build a parameterless request, e.g. `request("VOL")` => `MCU+PAS+RAKOIT:VOL&`.
pub fn request(command: &str) -> String {
    format!("{SERIAL_PREFIX}{command}{TERMINATOR}")
}

/// Build a request carrying a parameter, e.g.
/// `request_with_param("VOL", "50")` => `MCU+PAS+RAKOIT:VOL:50&`.
pub fn request_with_param(command: &str, param: &str) -> String {
    format!("{SERIAL_PREFIX}{command}:{param}{TERMINATOR}")
}

/// The reply prefix a request is answered under, e.g. `MCU+PAS+RAKOIT:VOL:`.
pub fn reply_prefix(command: &str) -> String {
    format!("{SERIAL_PREFIX}{command}:")
}

/// Extract the parameter out of a reply to `command`.
///
/// Tolerates leading bytes before the routing prefix, since some firmware
/// revisions pad replies. Returns `None` when the command tag or terminator
/// is missing.
pub fn reply_param<'a>(reply: &'a str, command: &str) -> Option<&'a str> {
    let tag = format!("{command}:");
    let start = reply.find(&tag)? + tag.len();
    let rest = &reply[start..];
    let end = rest.find(TERMINATOR)?;
    Some(&rest[..end])
}

/// Extract the data following a notification prefix, e.g.
/// `notify_param("AXX+VOL+37&", "AXX+VOL+")` => `Some("37")`.
///
/// The terminator is optional; push notifications from older firmware omit it.
pub fn notify_param<'a>(payload: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = payload.strip_prefix(prefix)?;
    Some(rest.strip_suffix(TERMINATOR).unwrap_or(rest))
}
