//! Socket fetch client.
//!
//! Performs one HTTP/1.0 GET over a raw TCP (or TLS) connection:
//! - sends a minimal request built by [`request::build_request`]
//! - parses the status line and headers with [`response::ResponseParser`]
//! - streams the body, untouched, into the caller's sink
//!
//! Redirects are reported, not followed; [`crate::proxy::redirects`] drives
//! the chain. The connection is owned by [`SocketClient::fetch_once`] and is
//! closed when it returns, on every path.

mod request;
mod response;
mod transport;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use url::Url;

use crate::config::{BODY_CHUNK_SIZE, MAX_HEADER_BLOCK_BYTES};
use crate::error_handling::ProxyError;
use crate::proxy::types::{FetchSuccess, ForwardedHeaders};

pub use request::build_request;
pub use response::{is_allowed_mime, parse_content_type, LineOutcome, ParserState, ResponseParser};
pub use transport::{Connection, Transport};

/// Where fetched body bytes go.
pub type Sink = dyn AsyncWrite + Unpin + Send;

/// Result of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopOutcome {
    /// The body was written to the sink
    Complete(FetchSuccess),
    /// The origin redirected; `location` is the raw header value
    Redirect { location: String },
}

/// Performs one fetch attempt. The seam the redirect orchestrator drives.
pub trait Fetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        sink: &'a mut Sink,
    ) -> impl Future<Output = Result<HopOutcome, ProxyError>> + Send + 'a;
}

/// Fetches over the network through a [`Transport`].
pub struct SocketClient {
    transport: Arc<Transport>,
    forwarded: ForwardedHeaders,
}

impl SocketClient {
    pub fn new(transport: Arc<Transport>, forwarded: ForwardedHeaders) -> Self {
        Self {
            transport,
            forwarded,
        }
    }

    /// Fetches `url` once, writing the body to `sink` on a 200.
    ///
    /// # Errors
    ///
    /// - `MissingOrInvalidUrl` if `url` does not parse as an http(s) URL
    /// - `TlsUnsupported`, `Socket`, `Timeout` from the transport
    /// - any parser error from [`ResponseParser::feed_line`]
    /// - `EmptyBody` if the stream ends before the header block does
    pub async fn fetch_once(&self, url: &str, sink: &mut Sink) -> Result<HopOutcome, ProxyError> {
        let target = Url::parse(url).map_err(|_| ProxyError::MissingOrInvalidUrl)?;
        let secure = match target.scheme() {
            "https" => true,
            "http" => false,
            _ => return Err(ProxyError::MissingOrInvalidUrl),
        };
        let host = target
            .host_str()
            .ok_or(ProxyError::MissingOrInvalidUrl)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = target.port_or_known_default().unwrap_or(if secure { 443 } else { 80 });

        let mut conn = self.transport.connect(&host, port, secure).await?;

        let request = build_request(&target, &self.forwarded);
        let timeout = self.transport.timeout();
        with_timeout(timeout, "sending the request", async {
            conn.write_all(request.as_bytes()).await?;
            conn.flush().await
        })
        .await?;

        let mut reader = BufReader::new(conn);
        let mut parser = ResponseParser::new(url);
        let mut line = Vec::with_capacity(256);
        let mut header_bytes = 0usize;

        let success = loop {
            line.clear();
            let read = with_timeout(
                timeout,
                "reading response headers",
                reader.read_until(b'\n', &mut line),
            )
            .await?;
            if read == 0 {
                // The stream ended before the header block did
                return Err(ProxyError::EmptyBody);
            }

            header_bytes += read;
            if header_bytes > MAX_HEADER_BLOCK_BYTES {
                return Err(ProxyError::InvalidHttpResponse);
            }

            match parser.feed_line(&line)? {
                LineOutcome::Continue => continue,
                LineOutcome::Redirect(location) => {
                    debug!("{url} redirects to {location}");
                    return Ok(HopOutcome::Redirect { location });
                }
                LineOutcome::HeadersComplete(success) => break success,
            }
        };

        let mut chunk = vec![0u8; BODY_CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let n = with_timeout(timeout, "reading the body", reader.read(&mut chunk)).await?;
            if n == 0 {
                break;
            }
            sink.write_all(&chunk[..n]).await?;
            written += n as u64;
        }
        sink.flush().await?;

        debug!("{url}: {written} body bytes staged as {}", success.mime);
        Ok(HopOutcome::Complete(success))
    }
}

impl Fetcher for SocketClient {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        sink: &'a mut Sink,
    ) -> impl Future<Output = Result<HopOutcome, ProxyError>> + Send + 'a {
        self.fetch_once(url, sink)
    }
}

async fn with_timeout<T, F>(
    timeout: Duration,
    stage: &'static str,
    fut: F,
) -> Result<T, ProxyError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ProxyError::from),
        Err(_) => Err(ProxyError::Timeout {
            seconds: timeout.as_secs(),
            stage,
        }),
    }
}
