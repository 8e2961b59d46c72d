//! Scratch file staging.
//!
//! A [`StagedFile`] is created, empty and open for writing, before the first
//! byte is fetched. It ends in exactly one of two ways:
//! - [`StagedFile::promote`] renames it to its final, extension-bearing name
//! - anything else (explicit [`StagedFile::discard`], an early return, a
//!   panic unwinding through the pipeline) deletes the scratch file
//!
//! Names are unique per request (URL hash, random number, request epoch), so
//! concurrent requests never need to coordinate on the staging directory.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use rand::Rng;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::config::{EVENT_SCRATCH_PATH, TMP_FILE_PREFIX};
use crate::error_handling::ProxyError;
use crate::hooks::{self, PathHook};
use crate::proxy::client::Sink;
use crate::utils::sha1_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageState {
    Open,
    Promoted,
    Discarded,
}

/// The single scratch file owned by one request.
#[derive(Debug)]
pub struct StagedFile {
    scratch_path: PathBuf,
    handle: Option<File>,
    state: StageState,
}

impl StagedFile {
    /// Creates the scratch file for `target_url` under `dir`.
    ///
    /// The directory is created if missing. The name is
    /// `h2c_<sha1(url)>.<0-999>_<started_epoch>`; if that already exists a
    /// second name is tried with the current time in microseconds instead of
    /// the request epoch. `hook` may rewrite each candidate path before it is
    /// opened. Files are created exclusively, so two requests never share one.
    ///
    /// # Errors
    ///
    /// - `CannotCreateDirectory` if `dir` cannot be created
    /// - `CannotCreateFile` if the scratch file cannot be opened for writing
    pub async fn create(
        dir: &Path,
        target_url: &str,
        started_epoch: u64,
        hook: Option<&dyn PathHook>,
    ) -> Result<Self, ProxyError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|source| ProxyError::CannotCreateDirectory {
                path: dir.to_path_buf(),
                source,
            })?;

        let basename = format!("{TMP_FILE_PREFIX}{}", sha1_hex(target_url));
        let mut stamp = started_epoch.to_string();
        let mut retried = false;

        let (scratch_path, handle) = loop {
            let candidate = dir.join(scratch_name(&basename, &stamp));
            let path = hooks::dispatch(hook, EVENT_SCRATCH_PATH, candidate);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(handle) => break (path, handle),
                // Same URL requested twice within the same second
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && !retried => {
                    retried = true;
                    stamp = clock_micros().to_string();
                }
                Err(source) => return Err(ProxyError::CannotCreateFile { path, source }),
            }
        };

        debug!("Staging {target_url} in {}", scratch_path.display());
        Ok(Self {
            scratch_path,
            handle: Some(handle),
            state: StageState::Open,
        })
    }

    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    /// Writable end of the scratch file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the handle has already been closed.
    pub fn sink(&mut self) -> Result<&mut Sink, ProxyError> {
        match self.handle.as_mut() {
            Some(file) => Ok(file),
            None => Err(ProxyError::Io(io::Error::other("scratch file is closed"))),
        }
    }

    /// Closes the scratch file and renames it to `<scratch>.<ext>`, the
    /// extension derived from `mime`. A file already at the final path is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns `CannotRenameFile` if the rename fails; the scratch file is
    /// then removed when `self` drops.
    pub async fn promote(mut self, mime: &str) -> Result<PathBuf, ProxyError> {
        if let Some(mut file) = self.handle.take() {
            file.flush().await?;
        }

        let final_path = final_path_for(&self.scratch_path, &extension_for_mime(mime));
        remove_if_present(&final_path).await;

        fs::rename(&self.scratch_path, &final_path)
            .await
            .map_err(|source| ProxyError::CannotRenameFile {
                path: self.scratch_path.clone(),
                source,
            })?;

        self.state = StageState::Promoted;
        debug!(
            "Promoted {} to {}",
            self.scratch_path.display(),
            final_path.display()
        );
        Ok(final_path)
    }

    /// Closes and deletes the scratch file.
    pub async fn discard(mut self) {
        self.handle.take();
        remove_if_present(&self.scratch_path).await;
        self.state = StageState::Discarded;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.state != StageState::Open {
            return;
        }
        self.handle.take();
        // Blocking remove; only early returns and unwinds get here, failures
        // the pipeline sees go through the async `discard`
        match std::fs::remove_file(&self.scratch_path) {
            Ok(()) => debug!("Removed abandoned scratch file {}", self.scratch_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch file {}: {e}",
                self.scratch_path.display()
            ),
        }
    }
}

/// File extension of a promoted file, derived from a whitelisted media type.
///
/// ```
/// use h2c_proxy::proxy::extension_for_mime;
///
/// assert_eq!(extension_for_mime("image/jpeg"), "jpg");
/// assert_eq!(extension_for_mime("image/svg+xml"), "svg");
/// assert_eq!(extension_for_mime("application/xhtml+xml"), "xhtml");
/// ```
pub fn extension_for_mime(mime: &str) -> String {
    let subtype = ["image/", "text/", "application/"]
        .iter()
        .find_map(|prefix| mime.strip_prefix(prefix))
        .unwrap_or(mime);

    match subtype {
        "windows-bmp" | "ms-bmp" => "bmp",
        "svg+xml" | "svg-xml" => "svg",
        "xhtml+xml" => "xhtml",
        "jpeg" => "jpg",
        other => other,
    }
    .to_string()
}

fn scratch_name(basename: &str, stamp: &str) -> String {
    let n: u32 = rand::rng().random_range(0..=999);
    format!("{basename}.{n}_{stamp}")
}

fn final_path_for(scratch: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(scratch.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn clock_micros() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0)
}

/// Deletes `path`, treating a file that is already gone as success.
async fn remove_if_present(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {e}", path.display()),
    }
}
