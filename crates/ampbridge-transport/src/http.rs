use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::flavor::Flavor;

/// Stateless polling transport against a device's web endpoint.
///
/// Some firmware exposes only an HTTP query interface, so there is no frame
/// stream to listen on and no [`crate::AsyncLine`] surface here: every
/// exchange is one GET with the command in the query string, e.g.
/// `http://host/httpapi.asp?command=getPlayerStatus`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    target: Mutex<Option<Url>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            target: Mutex::new(None),
        }
    }

    fn lock_target(&self) -> MutexGuard<'_, Option<Url>> {
        self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn flavor(&self) -> Flavor {
        Flavor::HttpPolling
    }

    /// The endpoint URL requests go to, if set.
    pub fn target(&self) -> Option<String> {
        self.lock_target().as_ref().map(Url::to_string)
    }

    /// Point the transport at a device endpoint, e.g.
    /// `http://192.168.4.1/httpapi.asp`. No connection is held open.
    pub fn connect(&self, target: &str) -> Result<()> {
        let url = Url::parse(target).map_err(|err| TransportError::InvalidTarget {
            target: target.to_string(),
            reason: err.to_string(),
        })?;
        debug!(target = %url, "http transport configured");
        *self.lock_target() = Some(url);
        Ok(())
    }

    /// Forget the endpoint. Idempotent.
    pub fn close(&self) {
        self.lock_target().take();
    }

    /// Issue `command` with colon-joined parameters and return the raw body.
    pub async fn make_request(&self, command: &str, params: &[&str]) -> Result<Bytes> {
        let base = self
            .lock_target()
            .as_ref()
            .cloned()
            .ok_or(TransportError::NotConnected)?;

        let mut joined = command.to_string();
        for param in params {
            joined.push(':');
            joined.push_str(param);
        }

        let mut url = base;
        url.query_pairs_mut().append_pair("command", &joined);
        trace!(url = %url, "http request");

        let response = self.client.get(url).send().await?;
        Ok(response.bytes().await?)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_bad_urls() {
        let transport = HttpTransport::new();
        let result = transport.connect("not a url");
        assert!(matches!(result, Err(TransportError::InvalidTarget { .. })));
        assert!(transport.target().is_none());
    }

    #[test]
    fn test_connect_and_close() {
        let transport = HttpTransport::new();
        transport.connect("http://192.168.4.1/httpapi.asp").unwrap();
        assert_eq!(
            transport.target().as_deref(),
            Some("http://192.168.4.1/httpapi.asp")
        );
        transport.close();
        assert!(transport.target().is_none());
    }

    #[tokio::test]
    async fn test_request_without_target_fails_fast() {
        let transport = HttpTransport::new();
        let result = transport.make_request("getPlayerStatus", &[]).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_request_builds_colon_joined_command() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 1024];
            let read = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nOK")
                .await
                .unwrap();
            String::from_utf8_lossy(&request[..read]).to_string()
        });

        let transport = HttpTransport::new();
        transport
            .connect(&format!("http://{addr}/httpapi.asp"))
            .unwrap();
        let body = transport
            .make_request("MCU+PAS+RAKOIT", &["VOL", "50"])
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"OK");

        let seen = server.await.unwrap();
        assert!(
            seen.starts_with("GET /httpapi.asp?command=MCU%2BPAS%2BRAKOIT%3AVOL%3A50 "),
            "unexpected request line: {seen}"
        );
    }
}
