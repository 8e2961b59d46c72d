//! Path-rewrite hook.
//!
//! Fired once a file path has been computed and before the file is opened,
//! so an observer can relocate staged files or screenshots. The pipeline
//! always uses the path as it stands after the hook returns.

use std::path::{Path, PathBuf};

/// A computed path, offered to a [`PathHook`] for inspection or rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEvent {
    name: &'static str,
    path: PathBuf,
}

impl PathEvent {
    pub fn new(name: &'static str, path: PathBuf) -> Self {
        Self { name, path }
    }

    /// Event name, one of [`crate::config::EVENT_SCRATCH_PATH`] or
    /// [`crate::config::EVENT_SCREEN_PATH`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Observer of computed paths.
pub trait PathHook: Send + Sync {
    fn on_path(&self, event: &mut PathEvent);
}

impl<F> PathHook for F
where
    F: Fn(&mut PathEvent) + Send + Sync,
{
    fn on_path(&self, event: &mut PathEvent) {
        self(event)
    }
}

/// Runs `hook` (if any) over `path` and returns the resulting path.
pub fn dispatch(hook: Option<&dyn PathHook>, name: &'static str, path: PathBuf) -> PathBuf {
    let Some(hook) = hook else {
        return path;
    };
    let mut event = PathEvent::new(name, path);
    hook.on_path(&mut event);
    event.into_path()
}
