//! Redirect chain orchestration.
//!
//! Drives a [`Fetcher`] across a chain of `Location:` redirects. Hops are
//! strictly sequential: the next host is only known once the previous
//! response has been read.

use log::debug;

use crate::config::REDIRECT_MAX_LOOP;
use crate::error_handling::ProxyError;
use crate::proxy::client::{Fetcher, HopOutcome, Sink};
use crate::proxy::types::FetchSuccess;
use crate::proxy::url_resolver::resolve;
use crate::proxy::validate::is_http_url;

/// Fetches `start_url`, following up to [`REDIRECT_MAX_LOOP`] redirects.
///
/// Every hop shares the same sink; only the final 200 response writes to it.
///
/// # Errors
///
/// - `InvalidRedirectScheme` if a `Location:` value resolves to nothing
/// - `RedirectToNonHttpUrl` if it resolves to something that is not http(s)
/// - `RedirectLimitExceeded` once more than [`REDIRECT_MAX_LOOP`] redirects
///   would be followed
/// - any error of the underlying fetch
pub async fn follow_redirects<F: Fetcher>(
    fetcher: &F,
    start_url: &str,
    sink: &mut Sink,
) -> Result<FetchSuccess, ProxyError> {
    let mut current = start_url.to_string();
    let mut hops = 0usize;

    loop {
        let location = match fetcher.fetch(&current, sink).await? {
            HopOutcome::Complete(success) => return Ok(success),
            HopOutcome::Redirect { location } => location,
        };

        let next = resolve(&current, &location);
        if next.is_empty() {
            return Err(ProxyError::InvalidRedirectScheme(location));
        }
        if !is_http_url(&next) {
            return Err(ProxyError::RedirectToNonHttpUrl(next));
        }

        hops += 1;
        if hops > REDIRECT_MAX_LOOP {
            return Err(ProxyError::RedirectLimitExceeded {
                limit: REDIRECT_MAX_LOOP,
                url: next,
            });
        }

        debug!("Redirect hop {hops}: {current} -> {next}");
        current = next;
    }
}
