//! HTTP header constants.
//!
//! Headers written on the proxy response (cache and CORS policy) and the
//! inbound headers forwarded to the origin.

use axum::http::header::{self, HeaderName};

/// CORS headers set on every proxy response, success or failure.
pub const CORS_HEADERS: [(HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_REQUEST_METHOD, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS, GET"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
];

/// Content type of every proxy response body.
pub const JAVASCRIPT_CONTENT_TYPE: &str = "application/javascript";

/// `Cache-Control` value of failed responses.
pub const NO_CACHE: &str = "no-cache";

/// Format of `Expires` and `Last-Modified` values (always UTC).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

// Inbound headers passed through to the origin, in the order they are sent
/// Accept request header
pub const HEADER_ACCEPT: &str = "Accept";
/// User-Agent request header
pub const HEADER_USER_AGENT: &str = "User-Agent";
/// Referer request header
pub const HEADER_REFERER: &str = "Referer";
