//! Request validation.
//!
//! Gates the inbound parameters and environment before any network or
//! filesystem access. Checks run in a fixed order and the first failing check
//! decides the error.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{
    script_dir_of, ProxySettings, JS_LOG, MIN_EXECUTION_BUDGET_SECS, SOCKET_TIMEOUT_SECS,
};
use crate::error_handling::ProxyError;
use crate::proxy::types::{FetchRequest, RequestEnv, RequestOrigin};
use crate::utils::compile_regex_unsafe;

const HTTP_URL_PATTERN: &str = r"(?i)^https?://[a-z0-9]";

static HTTP_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(HTTP_URL_PATTERN, "HTTP_URL_RE"));

/// A request that failed validation.
///
/// Carries the callback the error must be rendered with: the supplied one when
/// it is safe, [`JS_LOG`] otherwise.
#[derive(Debug)]
pub struct Rejection {
    pub callback: String,
    pub error: ProxyError,
}

/// Returns true for `http://` or `https://` followed by an alphanumeric host character.
pub fn is_http_url(url: &str) -> bool {
    HTTP_URL_RE.is_match(url)
}

/// Returns true if a callback name only uses `A-Z a-z 0-9 _ . [ ]`.
pub fn is_valid_callback(callback: &str) -> bool {
    callback
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// Validates an inbound request against the proxy settings.
///
/// # Errors
///
/// Returns a [`Rejection`] holding the first failing check:
/// `RequestNotSent`, `PortNotFound`, `ShortExecTime`, `SocketExecTime`,
/// `MissingOrInvalidUrl`, then `InvalidCallback`.
pub fn validate_request(
    env: &RequestEnv,
    settings: &ProxySettings,
) -> Result<FetchRequest, Rejection> {
    let supplied = env.callback.as_deref().filter(|c| !c.is_empty());
    let callback_ok = supplied.map(is_valid_callback).unwrap_or(true);
    let callback = match supplied {
        Some(c) if callback_ok => c.to_string(),
        _ => JS_LOG.to_string(),
    };

    let reject = |error: ProxyError| Rejection {
        callback: callback.clone(),
        error,
    };

    let host = match env.host.as_deref() {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => return Err(reject(ProxyError::RequestNotSent)),
    };

    let port = env.port.ok_or_else(|| reject(ProxyError::PortNotFound))?;

    let budget = settings.execution_budget_secs;
    if budget < MIN_EXECUTION_BUDGET_SECS {
        return Err(reject(ProxyError::ShortExecTime {
            minimum: MIN_EXECUTION_BUDGET_SECS,
        }));
    }
    if budget <= SOCKET_TIMEOUT_SECS {
        return Err(reject(ProxyError::SocketExecTime {
            budget,
            timeout: SOCKET_TIMEOUT_SECS,
        }));
    }

    let target_url = match env.url.as_deref() {
        Some(u) if is_http_url(u) => u.to_string(),
        _ => return Err(reject(ProxyError::MissingOrInvalidUrl)),
    };

    if !callback_ok {
        return Err(reject(ProxyError::InvalidCallback));
    }

    Ok(FetchRequest {
        target_url,
        callback_name: callback,
        cross_domain_enabled: settings.cross_domain,
        execution_budget_secs: budget,
        origin: RequestOrigin {
            host,
            port,
            script_dir: script_dir_of(&env.script_name),
        },
        forwarded: env.forwarded.clone(),
        started_at: env.request_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::types::ForwardedHeaders;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn settings(budget: u64) -> ProxySettings {
        ProxySettings {
            images_path: PathBuf::from("/tmp/h2c"),
            cross_domain: true,
            execution_budget_secs: budget,
            cache_seconds: 300,
            public_dir: "images".to_string(),
        }
    }

    fn env() -> RequestEnv {
        RequestEnv {
            host: Some("example.com".to_string()),
            port: Some(80),
            script_name: "/h2c/proxy".to_string(),
            request_time: SystemTime::now(),
            url: Some("http://images.test/cat.png".to_string()),
            callback: None,
            forwarded: ForwardedHeaders::default(),
        }
    }

    #[test]
    fn test_valid_request_uses_default_callback() {
        let req = validate_request(&env(), &settings(60)).expect("should validate");
        assert_eq!(req.callback_name, "console.log");
        assert_eq!(req.target_url, "http://images.test/cat.png");
        assert_eq!(req.origin.script_dir, "/h2c");
        assert_eq!(req.origin.port, 80);
    }

    #[test]
    fn test_custom_callback_kept() {
        let mut e = env();
        e.callback = Some("h2c.callbacks[3]".to_string());
        let req = validate_request(&e, &settings(60)).expect("should validate");
        assert_eq!(req.callback_name, "h2c.callbacks[3]");
    }

    #[test]
    fn test_missing_host() {
        let mut e = env();
        e.host = Some(String::new());
        let err = validate_request(&e, &settings(60)).unwrap_err();
        assert!(matches!(err.error, ProxyError::RequestNotSent));
    }

    #[test]
    fn test_missing_port() {
        let mut e = env();
        e.port = None;
        let err = validate_request(&e, &settings(60)).unwrap_err();
        assert!(matches!(err.error, ProxyError::PortNotFound));
    }

    #[test]
    fn test_budget_checks() {
        let err = validate_request(&env(), &settings(5)).unwrap_err();
        assert!(matches!(err.error, ProxyError::ShortExecTime { minimum: 10 }));

        // Equal to the socket timeout is not enough
        let err = validate_request(&env(), &settings(30)).unwrap_err();
        assert!(matches!(
            err.error,
            ProxyError::SocketExecTime {
                budget: 30,
                timeout: 30
            }
        ));

        assert!(validate_request(&env(), &settings(31)).is_ok());
    }

    #[test]
    fn test_url_checks() {
        for bad in [None, Some(""), Some("ftp://x/y"), Some("http://"), Some("//x/y")] {
            let mut e = env();
            e.url = bad.map(str::to_string);
            let err = validate_request(&e, &settings(60)).unwrap_err();
            assert!(
                matches!(err.error, ProxyError::MissingOrInvalidUrl),
                "{:?} should be rejected",
                bad
            );
        }

        let mut e = env();
        e.url = Some("HTTPS://Example.com/a.png".to_string());
        assert!(validate_request(&e, &settings(60)).is_ok());
    }

    #[test]
    fn test_invalid_callback_falls_back_to_default() {
        let mut e = env();
        e.callback = Some("alert(1);x".to_string());
        let err = validate_request(&e, &settings(60)).unwrap_err();
        assert!(matches!(err.error, ProxyError::InvalidCallback));
        assert_eq!(err.callback, "console.log");
    }

    #[test]
    fn test_first_failure_wins() {
        // Host and callback are both wrong: the host check comes first,
        // but the unsafe callback must still not be echoed back
        let mut e = env();
        e.host = None;
        e.callback = Some("<script>".to_string());
        let err = validate_request(&e, &settings(5)).unwrap_err();
        assert!(matches!(err.error, ProxyError::RequestNotSent));
        assert_eq!(err.callback, "console.log");
    }

    #[test]
    fn test_is_valid_callback() {
        assert!(is_valid_callback(""));
        assert!(is_valid_callback("console.log"));
        assert!(is_valid_callback("a_b[0].c"));
        assert!(!is_valid_callback("a-b"));
        assert!(!is_valid_callback("a b"));
        assert!(!is_valid_callback("f()"));
    }
}
