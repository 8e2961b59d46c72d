//! Error type definitions.
//!
//! This module defines the failure taxonomy of the fetch pipeline and the
//! initialization errors of the binary.

use std::io;
use std::path::PathBuf;

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the TLS client configuration.
    #[error("TLS initialization error: {0}")]
    TlsError(String),

    /// Error preparing the staging directory.
    #[error("Staging directory initialization error: {0}")]
    StagingError(String),
}

/// Every way a proxy request can fail.
///
/// The `Display` text is the reason embedded in the JSONP error payload, so it
/// is written for the browser-side developer reading the console.
#[derive(Error, Debug)]
pub enum ProxyError {
    // Validation
    #[error("The client did not send the Host header")]
    RequestNotSent,

    #[error("The server did not report the listening port")]
    PortNotFound,

    #[error(
        "Execution time is less than {minimum} seconds, raise the execution budget (30 seconds or more is recommended)"
    )]
    ShortExecTime { minimum: u64 },

    #[error(
        "The execution budget ({budget}s) must be longer than the socket timeout ({timeout}s), raise the budget or lower the timeout"
    )]
    SocketExecTime { budget: u64, timeout: u64 },

    #[error("No such parameter \"url\" or it is not an http(s) url")]
    MissingOrInvalidUrl,

    #[error("Parameter \"callback\" contains invalid characters")]
    InvalidCallback,

    // Network
    #[error("TLS transport is not available, https urls cannot be fetched")]
    TlsUnsupported,

    #[error("SOCKET: {0}")]
    Socket(String),

    #[error("Timed out after {seconds} seconds while {stage}")]
    Timeout { seconds: u64, stage: &'static str },

    #[error("This request did not return a valid HTTP response")]
    InvalidHttpResponse,

    #[error("Request returned HTTP_304, this status code is incorrect because no Etag was sent")]
    NotModifiedUnsupported,

    #[error("Request returned HTTP_{0}")]
    UnexpectedStatus(u16),

    #[error("\"Location:\" header is blank")]
    BlankLocation,

    #[error("Invalid scheme in url ({0})")]
    InvalidRedirectScheme(String),

    #[error("\"Location:\" header redirected for a non-http url ({0})")]
    RedirectToNonHttpUrl(String),

    #[error("The response should be a redirect \"{0}\", but did not inform which header \"Location:\"")]
    RedirectMissingLocation(String),

    #[error("Limit of {limit} redirects was exceeded, maybe there is a problem: {url}")]
    RedirectLimitExceeded { limit: usize, url: String },

    // Content
    #[error("source is blank (Content-length: 0)")]
    EmptyContent,

    #[error("Content body is empty")]
    EmptyBody,

    #[error("{0} mimetype is invalid")]
    MimeNotAllowed(String),

    #[error("Not set the mimetype from \"{0}\"")]
    MimeMissing(String),

    // Filesystem
    #[error("Cannot create directory `{}`: {source}", .path.display())]
    CannotCreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Can not create file `{}`: {source}", .path.display())]
    CannotCreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rename the temporary file `{}`: {source}", .path.display())]
    CannotRenameFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An infrastructure fault outside the [`ProxyError`] taxonomy.
///
/// Faults are not folded into a JSONP payload; the server turns them into an
/// HTTP error response. `code` is the HTTP status to answer with, `0` meaning
/// "unspecified" (rendered as 500).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProxyFault {
    pub message: String,
    pub code: u16,
}

impl ProxyFault {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, 400)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, 500)
    }
}

/// Coarse classification of [`ProxyError`], used for logging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorCategory {
    /// Malformed or missing request inputs, environment misconfiguration
    Validation,
    /// Connect failures, TLS, malformed HTTP, redirect chain faults
    Network,
    /// Disallowed or absent MIME type, empty body
    Content,
    /// Directory or file creation, rename failures
    Filesystem,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Network => "network",
            ErrorCategory::Content => "content",
            ErrorCategory::Filesystem => "filesystem",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProxyError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::RequestNotSent
            | ProxyError::PortNotFound
            | ProxyError::ShortExecTime { .. }
            | ProxyError::SocketExecTime { .. }
            | ProxyError::MissingOrInvalidUrl
            | ProxyError::InvalidCallback => ErrorCategory::Validation,
            ProxyError::TlsUnsupported
            | ProxyError::Socket(_)
            | ProxyError::Timeout { .. }
            | ProxyError::InvalidHttpResponse
            | ProxyError::NotModifiedUnsupported
            | ProxyError::UnexpectedStatus(_)
            | ProxyError::BlankLocation
            | ProxyError::InvalidRedirectScheme(_)
            | ProxyError::RedirectToNonHttpUrl(_)
            | ProxyError::RedirectMissingLocation(_)
            | ProxyError::RedirectLimitExceeded { .. } => ErrorCategory::Network,
            ProxyError::EmptyContent
            | ProxyError::EmptyBody
            | ProxyError::MimeNotAllowed(_)
            | ProxyError::MimeMissing(_) => ErrorCategory::Content,
            ProxyError::CannotCreateDirectory { .. }
            | ProxyError::CannotCreateFile { .. }
            | ProxyError::CannotRenameFile { .. }
            | ProxyError::Io(_) => ErrorCategory::Filesystem,
        }
    }
}
