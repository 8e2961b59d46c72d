//! Cache headers and stale staging file cleanup.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::{CORS_HEADERS, HTTP_DATE_FORMAT, NO_CACHE, TMP_FILE_PREFIX};

/// Result of one pass over the staging directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Staging-prefixed files looked at
    pub scanned: usize,
    /// Files this pass deleted
    pub removed: usize,
}

/// Builds the cache and CORS headers of a proxy response.
///
/// A successful response is cacheable for `cache_seconds - 1` seconds from
/// `started`. Failures, and any response when `cache_seconds` is zero, are
/// marked `no-cache` and expire at `now`.
pub fn cache_headers(
    success: bool,
    started: SystemTime,
    now: SystemTime,
    cache_seconds: u64,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if success && cache_seconds > 0 {
        let lifetime = cache_seconds - 1;
        insert(&mut headers, header::LAST_MODIFIED, http_date(started));
        insert(
            &mut headers,
            header::CACHE_CONTROL,
            format!("max-age={lifetime}"),
        );
        insert(
            &mut headers,
            header::EXPIRES,
            http_date(started + Duration::from_secs(lifetime)),
        );
        insert(
            &mut headers,
            header::ACCESS_CONTROL_MAX_AGE,
            cache_seconds.to_string(),
        );
    } else {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        insert(&mut headers, header::EXPIRES, http_date(now));
    }

    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    headers
}

/// Whether there is time left for housekeeping. A budget of zero is unlimited.
pub fn within_budget(elapsed: Duration, budget_secs: u64) -> bool {
    budget_secs == 0 || elapsed < Duration::from_secs(budget_secs)
}

/// Age after which a staged file is swept: twice the cache lifetime.
pub fn stale_after(cache_seconds: u64) -> Duration {
    Duration::from_secs(cache_seconds.saturating_mul(2))
}

/// Deletes staging-prefixed files in `dir` older than `max_age` at `reference`.
///
/// Age is measured from the creation time, or the modification time on
/// filesystems that do not record creation. Files removed concurrently by
/// another request are skipped silently; a missing directory is an empty pass.
pub async fn sweep_stale_files(dir: &Path, reference: SystemTime, max_age: Duration) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            warn!("Cannot list staging directory {}: {e}", dir.display());
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error while listing {}: {e}", dir.display());
                break;
            }
        };

        if !entry.file_name().to_string_lossy().starts_with(TMP_FILE_PREFIX) {
            continue;
        }

        // Gone already, or not a regular file
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        report.scanned += 1;

        let Ok(born) = metadata.created().or_else(|_| metadata.modified()) else {
            continue;
        };
        // A file newer than the reference has a negative age
        let Ok(age) = reference.duration_since(born) else {
            continue;
        };
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Swept {} (age {}s)", entry.path().display(), age.as_secs());
                report.removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to sweep {}: {e}", entry.path().display()),
        }
    }

    if report.removed > 0 {
        info!(
            "Swept {} stale file(s) out of {} in {}",
            report.removed,
            report.scanned,
            dir.display()
        );
    }
    report
}

fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: String) {
    match HeaderValue::try_from(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => warn!("Skipping invalid {name} header value: {e}"),
    }
}
