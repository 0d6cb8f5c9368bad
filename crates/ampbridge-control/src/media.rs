use std::time::Duration;

use ampbridge_transport::{request_with_reply, AsyncLine, Flavor, DEFAULT_REPLY_TIMEOUT};
use ampbridge_wire::command;

use crate::error::{ControlError, Result};

/// Typed media operations over a line-flavored device connection.
///
/// Wraps the raw command vocabulary (`MCU+PAS+RAKOIT:VOL&` and friends) into
/// methods that return parsed values. The transport is shared, so one
/// `MediaControl` and any number of subscriptions can coexist on a single
/// connection.
#[derive(Debug, Clone)]
pub struct MediaControl<T> {
    pub(crate) transport: T,
    pub(crate) reply_timeout: Duration,
}

impl<T: AsyncLine<Message = String>> MediaControl<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Use a different deadline for replies. The firmware's 200ms send
    /// spacing means queued commands can take a while to reach the wire.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn ensure_line(&self) -> Result<()> {
        match self.transport.flavor() {
            Flavor::LineTcp => Ok(()),
            other => Err(ControlError::UnsupportedFlavor(other)),
        }
    }

    /// Issue `command` and return the reply's parameter text, e.g.
    /// `query("VOL")` sends `MCU+PAS+RAKOIT:VOL&` and returns `"50"` out of
    /// `MCU+PAS+RAKOIT:VOL:50&`.
    pub(crate) async fn query(&self, cmd: &'static str) -> Result<String> {
        self.exchange(command::request(cmd), cmd).await
    }

    /// Like [`Self::query`], with a parameter: `query_with_param("VOL", "50")`
    /// sends `MCU+PAS+RAKOIT:VOL:50&`.
    pub(crate) async fn query_with_param(
        &self,
        cmd: &'static str,
        param: &str,
    ) -> Result<String> {
        self.exchange(command::request_with_param(cmd, param), cmd)
            .await
    }

    async fn exchange(&self, request: String, cmd: &'static str) -> Result<String> {
        self.ensure_line()?;
        let reply = request_with_reply(
            &self.transport,
            request,
            &command::reply_prefix(cmd),
            self.reply_timeout,
        )
        .await?;
        let text = String::from_utf8_lossy(&reply);
        command::reply_param(&text, cmd)
            .map(str::to_string)
            .ok_or_else(|| ControlError::no_match(cmd, &reply))
    }

    /// Send a raw request and return the raw reply text.
    ///
    /// The reply listener matches every frame, so this assumes the device's
    /// next frame answers the request. Meant for commands the typed surface
    /// doesn't cover.
    pub async fn direct_command(&self, request: impl Into<String>) -> Result<String> {
        self.ensure_line()?;
        let reply =
            request_with_reply(&self.transport, request.into(), "", self.reply_timeout).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}
