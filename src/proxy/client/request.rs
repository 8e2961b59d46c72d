//! Minimal HTTP/1.0 GET request construction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::config::{HEADER_ACCEPT, HEADER_REFERER, HEADER_USER_AGENT};
use crate::proxy::types::ForwardedHeaders;

const CRLF: &str = "\r\n";

/// Builds the request bytes for a GET of `target`.
///
/// Header order: `Authorization` (when the URL carries userinfo), forwarded
/// `Accept`, `User-Agent`, `Referer`, then `Host` and `Connection: close`.
pub fn build_request(target: &Url, forwarded: &ForwardedHeaders) -> String {
    let mut request = String::with_capacity(256);

    request.push_str("GET ");
    request.push_str(if target.path().is_empty() {
        "/"
    } else {
        target.path()
    });
    if let Some(query) = target.query().filter(|q| !q.is_empty()) {
        request.push('?');
        request.push_str(query);
    }
    request.push_str(" HTTP/1.0");
    request.push_str(CRLF);

    if !target.username().is_empty() {
        let credentials = format!("{}:{}", target.username(), target.password().unwrap_or(""));
        request.push_str("Authorization: Basic ");
        request.push_str(&STANDARD.encode(credentials));
        request.push_str(CRLF);
    }

    for (name, value) in [
        (HEADER_ACCEPT, &forwarded.accept),
        (HEADER_USER_AGENT, &forwarded.user_agent),
        (HEADER_REFERER, &forwarded.referer),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            // CR or LF in a forwarded value would let it inject headers
            if value.contains(['\r', '\n']) {
                continue;
            }
            request.push_str(name);
            request.push_str(": ");
            request.push_str(value);
            request.push_str(CRLF);
        }
    }

    request.push_str("Host: ");
    request.push_str(target.host_str().unwrap_or_default());
    if let Some(port) = target.port() {
        request.push_str(&format!(":{port}"));
    }
    request.push_str(CRLF);
    request.push_str("Connection: close");
    request.push_str(CRLF);
    request.push_str(CRLF);

    request
}
