//! Search-path lookup of executables.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::trace;

/// Result of looking a command name up on the search path.
///
/// Resolution never fails with an error: an unknown name is a value the
/// caller can test, mirroring how a shell reports `command not found`
/// through its status rather than aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The absolute path of the executable.
    Found(PathBuf),
    /// No executable matched the name.
    NotFound(String),
}

impl Resolution {
    /// Check if the command was found.
    pub fn ok(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// Get the resolved path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Found(path) => Some(path),
            Resolution::NotFound(_) => None,
        }
    }

    /// Convert into the resolved path, if any.
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Resolution::Found(path) => Some(path),
            Resolution::NotFound(_) => None,
        }
    }
}

/// Resolve `name` against `search_path` (a `PATH`-style list).
///
/// Names containing a `/` bypass the search path and are taken relative to
/// `cwd`. Empty search-path entries stand for `cwd`, and relative entries are
/// resolved against it. Nothing is cached, so every call observes the
/// current filesystem and search path.
pub fn resolve(name: &str, search_path: Option<&OsStr>, cwd: &Path) -> Resolution {
    if name.is_empty() {
        return Resolution::NotFound(String::new());
    }

    let search_path = search_path.and_then(|paths| {
        let entries = std::env::split_paths(paths).map(|dir| {
            if dir.as_os_str().is_empty() {
                cwd.to_path_buf()
            } else {
                cwd.join(dir)
            }
        });
        std::env::join_paths(entries).ok()
    });

    match which::which_in(name, search_path, cwd) {
        Ok(path) => {
            trace!(name, path = %path.display(), "resolved command");
            Resolution::Found(path)
        }
        Err(e) => {
            trace!(name, error = %e, "command not resolved");
            Resolution::NotFound(name.to_string())
        }
    }
}
