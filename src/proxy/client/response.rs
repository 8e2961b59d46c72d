//! Status line and header parsing.
//!
//! A line-driven state machine: pre-status, headers, then body. The parser
//! never sees body bytes; once it reports [`LineOutcome::HeadersComplete`] the
//! caller streams the rest of the connection to the sink.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::config::{ALLOWED_MIME_TYPES, REDIRECT_STATUS_CODES};
use crate::error_handling::ProxyError;
use crate::proxy::types::FetchSuccess;
use crate::utils::compile_regex_unsafe;

const STATUS_LINE_PATTERN: &str = r"(?i)^HTTP/1\.\d+ (\d{3})(?:\s|$)";
const CHARSET_SPLIT_PATTERN: &str = r";\s*charset=";

static STATUS_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(STATUS_LINE_PATTERN, "STATUS_LINE_RE"));
static CHARSET_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(CHARSET_SPLIT_PATTERN, "CHARSET_SPLIT_RE"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    PreStatus,
    Headers,
    Body,
}

/// What a single line meant to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Keep feeding lines
    Continue,
    /// A redirect response named its target; stop reading
    Redirect(String),
    /// Header block ended on an acceptable response; the body follows
    HeadersComplete(FetchSuccess),
}

/// Parses one response from the status line to the end of its headers.
#[derive(Debug)]
pub struct ResponseParser {
    url: String,
    state: ParserState,
    status: Option<u16>,
    is_redirect: bool,
    mime: Option<String>,
    charset: Option<String>,
}

impl ResponseParser {
    /// `url` is only used in error messages.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ParserState::PreStatus,
            status: None,
            is_redirect: false,
            mime: None,
            charset: None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Feeds one raw line, terminator included or not.
    ///
    /// # Errors
    ///
    /// Any of the response-level failures: `InvalidHttpResponse`,
    /// `NotModifiedUnsupported`, `UnexpectedStatus`, `BlankLocation`,
    /// `EmptyContent`, `MimeNotAllowed`, `RedirectMissingLocation`,
    /// `MimeMissing`.
    pub fn feed_line(&mut self, raw: &[u8]) -> Result<LineOutcome, ProxyError> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        match self.state {
            ParserState::PreStatus => self.status_line(line),
            ParserState::Headers => self.header_line(line),
            // Body bytes are streamed by the caller, never parsed
            ParserState::Body => Ok(LineOutcome::Continue),
        }
    }

    fn status_line(&mut self, line: &str) -> Result<LineOutcome, ProxyError> {
        let code = STATUS_LINE_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u16>().ok())
            .ok_or(ProxyError::InvalidHttpResponse)?;

        if code == 304 {
            return Err(ProxyError::NotModifiedUnsupported);
        }

        self.is_redirect = REDIRECT_STATUS_CODES.contains(&code);
        if !self.is_redirect && code != 200 {
            return Err(ProxyError::UnexpectedStatus(code));
        }

        debug!("{} answered HTTP {}", self.url, code);
        self.status = Some(code);
        self.state = ParserState::Headers;
        Ok(LineOutcome::Continue)
    }

    fn header_line(&mut self, line: &str) -> Result<LineOutcome, ProxyError> {
        if line.trim().is_empty() {
            return self.end_of_headers();
        }

        let Some((name, value)) = line.split_once(':') else {
            return Ok(LineOutcome::Continue);
        };
        let value = value.trim();

        if name.eq_ignore_ascii_case("location") {
            // A Location on a 200 means nothing
            if !self.is_redirect {
                return Ok(LineOutcome::Continue);
            }
            if value.is_empty() {
                return Err(ProxyError::BlankLocation);
            }
            return Ok(LineOutcome::Redirect(value.to_string()));
        }

        if name.eq_ignore_ascii_case("content-length") {
            if value.parse::<u64>() == Ok(0) {
                return Err(ProxyError::EmptyContent);
            }
            return Ok(LineOutcome::Continue);
        }

        if name.eq_ignore_ascii_case("content-type") {
            let (mime, charset) = parse_content_type(value);
            if !is_allowed_mime(&mime) {
                return Err(ProxyError::MimeNotAllowed(mime));
            }
            debug!("{} content type {} (charset {:?})", self.url, mime, charset);
            self.mime = Some(mime);
            self.charset = charset;
        }

        Ok(LineOutcome::Continue)
    }

    fn end_of_headers(&mut self) -> Result<LineOutcome, ProxyError> {
        if self.is_redirect {
            return Err(ProxyError::RedirectMissingLocation(self.url.clone()));
        }
        let Some(mime) = self.mime.clone() else {
            return Err(ProxyError::MimeMissing(self.url.clone()));
        };
        self.state = ParserState::Body;
        Ok(LineOutcome::HeadersComplete(FetchSuccess {
            mime,
            charset: self.charset.clone(),
        }))
    }
}

/// Splits a `Content-Type` value into a normalized media type and charset.
///
/// The value is lowercased and the `x-` infix removed, so
/// `Image/X-PNG; charset=UTF-8` yields `("image/png", Some("utf-8"))`.
pub fn parse_content_type(value: &str) -> (String, Option<String>) {
    let lowered = value.to_lowercase();

    let charset = CHARSET_SPLIT_RE
        .splitn(&lowered, 2)
        .nth(1)
        .map(|c| c.split(';').next().unwrap_or("").trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty());

    let normalized = lowered.replace("/x-", "/");
    let mime = normalized
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    (mime, charset)
}

/// Exact membership test against [`ALLOWED_MIME_TYPES`].
pub fn is_allowed_mime(mime: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime)
}
