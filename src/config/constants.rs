//! Configuration constants.
//!
//! Fixed operational parameters of the proxy: socket timeout, redirect limit,
//! staging file naming and cache lifetime.

use std::time::Duration;

/// Default JSONP callback used when the request does not name one
/// (or names one that fails validation).
pub const JS_LOG: &str = "console.log";

/// Connect and read timeout for every socket opened towards an origin, in seconds.
pub const SOCKET_TIMEOUT_SECS: u64 = 30;
/// [`SOCKET_TIMEOUT_SECS`] as a `Duration`.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(SOCKET_TIMEOUT_SECS);

/// Maximum number of `Location:` redirects followed for a single request.
/// The initial fetch does not count, so a full chain is at most 11 fetches.
pub const REDIRECT_MAX_LOOP: usize = 10;

/// Every scratch and promoted file in the staging directory starts with this.
/// The stale-file sweep only ever touches names carrying it.
pub const TMP_FILE_PREFIX: &str = "h2c_";

/// Browser cache lifetime for successful responses, in seconds.
/// Staged files older than twice this value are swept.
pub const CACHE_SECONDS: u64 = 60 * 5 * 1000;

/// Smallest execution budget the validator accepts, in seconds.
pub const MIN_EXECUTION_BUDGET_SECS: u64 = 10;

/// Default execution budget handed to the validator, in seconds.
pub const DEFAULT_EXECUTION_BUDGET_SECS: u64 = 60;

/// Upper bound on the size of a status line plus header block.
/// Origins sending more than this are treated as not speaking HTTP.
pub const MAX_HEADER_BLOCK_BYTES: usize = 64 * 1024;

/// Read buffer size used when streaming a body to the scratch file.
pub const BODY_CHUNK_SIZE: usize = 16 * 1024;

/// Media types an origin may answer with. Compared after lowercasing and
/// stripping the `x-` infix (`image/x-png` becomes `image/png`).
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/bmp",
    "image/windows-bmp",
    "image/ms-bmp",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "text/html",
    "application/xhtml",
    "application/xhtml+xml",
    "image/svg+xml",
    // Old servers (bug)
    "image/svg-xml",
];

/// Status codes treated as a redirect when followed by a `Location:` header.
pub const REDIRECT_STATUS_CODES: &[u16] = &[301, 302, 303, 307, 308];

/// Prefix of the error payload rendered into the callback on failure.
pub const ERROR_PAYLOAD_PREFIX: &str = "error: html2canvas-proxy-php: ";

/// Event name fired when a scratch path has been computed.
pub const EVENT_SCRATCH_PATH: &str = "scratch.path";
/// Event name fired when a screenshot path has been computed.
pub const EVENT_SCREEN_PATH: &str = "screen.path";

/// Interval between periodic outcome summaries in the log, in seconds.
pub const STATS_LOG_INTERVAL_SECS: u64 = 60;
