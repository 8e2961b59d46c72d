//! Small helpers shared across modules.

use regex::Regex;

/// Compiles a regex pattern that is a compile-time constant.
///
/// Panics with context if the pattern is invalid, which is a programming error.
pub(crate) fn compile_regex_unsafe(pattern: &str, context: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in {}: {}. This is a programming error.",
            pattern, context, e
        )
    })
}

/// Encodes a string as a JSON string literal (quotes included).
pub(crate) fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Lowercase hex SHA-1 digest of a string.
pub(crate) fn sha1_hex(value: &str) -> String {
    use sha1::{Digest, Sha1};

    hex::encode(Sha1::digest(value.as_bytes()))
}
