//! JSONP payload rendering.
//!
//! Every response body is `<callback>(<json string>);`. The argument is one of:
//! - a `data:` URI holding the fetched bytes (cross-domain inlining)
//! - the same-origin URL of the promoted file
//! - `error: html2canvas-proxy-php: <reason>`

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::config::ERROR_PAYLOAD_PREFIX;
use crate::proxy::types::RequestOrigin;
use crate::utils::{compile_regex_unsafe, json_string};

static HOST_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(r":[0-9]+$", "HOST_PORT_RE"));

/// Renders a fetched body as an inlined data URI.
///
/// Raster images are base64-encoded; SVG and markup are percent-escaped
/// with [`ascii_to_inline`].
///
/// ```
/// use h2c_proxy::proxy::render_inline;
///
/// let js = render_inline("console.log", "image/png", None, b"PNG");
/// assert_eq!(js, r#"console.log("data:image/png;base64,UE5H");"#);
/// ```
pub fn render_inline(callback: &str, mime: &str, charset: Option<&str>, body: &[u8]) -> String {
    let mut media_type = mime.to_string();
    if let Some(charset) = charset.filter(|c| !c.is_empty()) {
        media_type.push_str(";charset=");
        media_type.push_str(charset);
    }

    let payload = if mime.starts_with("image/") && !mime.starts_with("image/svg") {
        format!("data:{media_type};base64,{}", STANDARD.encode(body))
    } else {
        format!("data:{media_type},{}", ascii_to_inline(body))
    };

    invoke(callback, &payload)
}

/// Renders the same-origin URL of a promoted file.
pub fn render_reference(
    callback: &str,
    origin: &RequestOrigin,
    public_dir: &str,
    file_name: &str,
) -> String {
    invoke(callback, &reference_url(origin, public_dir, file_name))
}

/// Renders a failure reason.
pub fn render_failure(callback: &str, reason: &str) -> String {
    invoke(callback, &format!("{ERROR_PAYLOAD_PREFIX}{reason}"))
}

/// Absolute URL under which this server serves a promoted file.
///
/// The scheme is https only for port 443. Any port in the `Host` value is
/// replaced by the listening port, which is omitted when it is 80 or 443.
pub fn reference_url(origin: &RequestOrigin, public_dir: &str, file_name: &str) -> String {
    let scheme = if origin.port == 443 { "https" } else { "http" };
    let host = HOST_PORT_RE.replace(&origin.host, "");
    let port = match origin.port {
        80 | 443 => String::new(),
        other => format!(":{other}"),
    };

    let mut url = format!("{scheme}://{host}{port}{}/", origin.script_dir);
    if !public_dir.is_empty() {
        url.push_str(public_dir);
        url.push('/');
    }
    url.push_str(file_name);
    url
}

/// Percent-escapes text for a non-base64 data URI.
///
/// Only a fixed set of characters is escaped; backspace is dropped. Bytes
/// that are not valid UTF-8 are escaped as `%XX`.
pub fn ascii_to_inline(body: &[u8]) -> String {
    let mut out = String::with_capacity(body.len() + body.len() / 8);

    for chunk in body.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                ' ' => out.push_str("%20"),
                '"' => out.push_str("%22"),
                '#' => out.push_str("%23"),
                '&' => out.push_str("%26"),
                '/' => out.push_str("%2F"),
                '\\' => out.push_str("%5C"),
                ':' => out.push_str("%3A"),
                '?' => out.push_str("%3F"),
                '\0' => out.push_str("%00"),
                '\t' => out.push_str("%09"),
                '\n' => out.push_str("%0A"),
                '\r' => out.push_str("%0D"),
                '\u{8}' => {}
                other => out.push(other),
            }
        }
        for byte in chunk.invalid() {
            out.push_str(&format!("%{byte:02X}"));
        }
    }

    out
}

fn invoke(callback: &str, argument: &str) -> String {
    format!("{callback}({});", json_string(argument))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(host: &str, port: u16, script_dir: &str) -> RequestOrigin {
        RequestOrigin {
            host: host.to_string(),
            port,
            script_dir: script_dir.to_string(),
        }
    }

    #[test]
    fn test_inline_png_is_base64() {
        let body = [0x89, b'P', b'N', b'G', 0x00, 0xff];
        let js = render_inline("console.log", "image/png", None, &body);
        assert_eq!(
            js,
            format!("console.log(\"data:image/png;base64,{}\");", STANDARD.encode(body))
        );
    }

    #[test]
    fn test_inline_svg_is_escaped_with_charset() {
        let js = render_inline(
            "cb",
            "image/svg+xml",
            Some("utf-8"),
            b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>",
        );
        assert_eq!(
            js,
            "cb(\"data:image/svg+xml;charset=utf-8,<svg%20xmlns=%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%2F>\");"
        );
    }

    #[test]
    fn test_inline_html_is_escaped() {
        let js = render_inline("cb", "text/html", None, b"<p>a&b</p>");
        assert_eq!(js, "cb(\"data:text/html,<p>a%26b<%2Fp>\");");
    }

    #[test]
    fn test_ascii_to_inline_table() {
        assert_eq!(
            ascii_to_inline(b" \"#&/\\:?\0\t\n\r\x08x"),
            "%20%22%23%26%2F%5C%3A%3F%00%09%0A%0Dx"
        );
        assert_eq!(ascii_to_inline("café".as_bytes()), "café");
        assert_eq!(ascii_to_inline(b"a\xffb"), "a%FFb");
    }

    #[test]
    fn test_reference_url_default_port() {
        let url = reference_url(&origin("example.com", 80, ""), "images", "h2c_x.1_2.png");
        assert_eq!(url, "http://example.com/images/h2c_x.1_2.png");
    }

    #[test]
    fn test_reference_url_https_and_script_dir() {
        let url = reference_url(&origin("example.com:443", 443, "/h2c"), "images", "f.gif");
        assert_eq!(url, "https://example.com/h2c/images/f.gif");
    }

    #[test]
    fn test_reference_url_custom_port_replaces_host_port() {
        let url = reference_url(&origin("localhost:9999", 8080, ""), "", "f.png");
        assert_eq!(url, "http://localhost:8080/f.png");
    }

    #[test]
    fn test_render_reference() {
        let js = render_reference("cb", &origin("example.com", 80, ""), "images", "f.png");
        assert_eq!(js, "cb(\"http://example.com/images/f.png\");");
    }

    #[test]
    fn test_render_failure() {
        let js = render_failure("console.log", "image/webp mimetype is invalid");
        assert_eq!(
            js,
            "console.log(\"error: html2canvas-proxy-php: image/webp mimetype is invalid\");"
        );
    }

    #[test]
    fn test_failure_reason_is_json_escaped() {
        let js = render_failure("cb", "bad \"quote\"\nnewline");
        assert_eq!(
            js,
            "cb(\"error: html2canvas-proxy-php: bad \\\"quote\\\"\\nnewline\");"
        );
    }
}
