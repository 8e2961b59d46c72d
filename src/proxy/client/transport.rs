//! TCP and TLS connection setup towards an origin.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::config::SOCKET_TIMEOUT;
use crate::error_handling::{InitializationError, ProxyError};

/// A bidirectional byte stream to an origin, plain or TLS-wrapped.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Connection for T {}

/// Opens connections with a fixed timeout.
///
/// TLS support is decided once, when the transport is built: a transport
/// without a connector fails every https fetch with
/// [`ProxyError::TlsUnsupported`] before touching the network.
#[derive(Clone)]
pub struct Transport {
    tls: Option<TlsConnector>,
    timeout: Duration,
}

impl Transport {
    /// Transport with TLS support backed by the `webpki-roots` trust anchors.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::TlsError` if the TLS client configuration
    /// cannot be built with the ring crypto provider.
    pub fn with_tls() -> Result<Self, InitializationError> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| InitializationError::TlsError(e.to_string()))?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self {
            tls: Some(TlsConnector::from(Arc::new(config))),
            timeout: SOCKET_TIMEOUT,
        })
    }

    /// Transport that can only speak plain http.
    pub fn plain_only() -> Self {
        Self {
            tls: None,
            timeout: SOCKET_TIMEOUT,
        }
    }

    /// Overrides the connect and read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn supports_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connects to `host:port`, wrapping the socket in TLS when `secure`.
    ///
    /// # Errors
    ///
    /// - `TlsUnsupported` if `secure` and the transport has no TLS connector
    /// - `Socket` if the connection or handshake fails
    /// - `Timeout` if either takes longer than the transport timeout
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        secure: bool,
    ) -> Result<Box<dyn Connection>, ProxyError> {
        let connector = if secure {
            match &self.tls {
                Some(c) => Some(c.clone()),
                None => return Err(ProxyError::TlsUnsupported),
            }
        } else {
            None
        };

        debug!("Connecting to {host}:{port} (tls: {secure})");
        let sock = match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await
        {
            Ok(Ok(sock)) => sock,
            Ok(Err(e)) => {
                return Err(ProxyError::Socket(format!(
                    "{e} ({})",
                    e.raw_os_error().unwrap_or(0)
                )))
            }
            Err(_) => {
                return Err(ProxyError::Timeout {
                    seconds: self.timeout.as_secs(),
                    stage: "connecting",
                })
            }
        };

        let Some(connector) = connector else {
            return Ok(Box::new(sock));
        };

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ProxyError::Socket(format!("invalid server name {host}: {e}")))?;

        match tokio::time::timeout(self.timeout, connector.connect(server_name, sock)).await {
            Ok(Ok(stream)) => Ok(Box::new(stream)),
            Ok(Err(e)) => Err(ProxyError::Socket(format!("TLS handshake failed: {e}"))),
            Err(_) => Err(ProxyError::Timeout {
                seconds: self.timeout.as_secs(),
                stage: "negotiating TLS",
            }),
        }
    }
}
