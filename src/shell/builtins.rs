//! Builtins implemented directly on the shell.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};
use tracing::debug;

use super::Shell;
use crate::error::PoshError;
use crate::Result;

/// Where [`Shell::add_to_path`] inserts a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathPosition {
    #[default]
    Append,
    Prepend,
}

fn writable(path: &Path) -> bool {
    access(path, AccessFlags::W_OK).is_ok()
}

impl Shell {
    /// Change the working directory.
    ///
    /// Relative paths resolve against the current directory; an empty path
    /// means `$HOME`. The directory must exist and be writable. On failure
    /// the exit code is set to 1 with a message in [`error`](Self::error)
    /// and the directory is unchanged.
    pub fn cd(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return self.cd_home();
        }

        let target = self.cwd.join(path);
        match target.canonicalize() {
            Err(e) => {
                self.builtin_response(1, format!("cd: {}: {}", target.display(), e));
            }
            Ok(dir) if !dir.is_dir() => {
                self.builtin_response(1, format!("cd: not a directory: {}", dir.display()));
            }
            Ok(dir) if !writable(&dir) => {
                self.builtin_response(1, format!("cd: permission denied: {}", dir.display()));
            }
            Ok(dir) => {
                self.enter_dir(dir);
                self.builtin_response(0, "");
            }
        }
        self
    }

    /// Make `dir` the working directory and keep `PWD` in sync.
    ///
    /// `dir` must already be canonical.
    pub(crate) fn enter_dir(&mut self, dir: PathBuf) {
        debug!(cwd = %dir.display(), "changed directory");
        self.env
            .insert("PWD".to_string(), dir.to_string_lossy().into_owned());
        self.cwd = dir;
    }

    /// Change to `$HOME`, or `/` when it is unset.
    pub fn cd_home(&mut self) -> &mut Self {
        let home = match self.get_env("HOME") {
            Some(home) if !home.is_empty() => home.to_string(),
            _ => "/".to_string(),
        };
        self.cd(home)
    }

    /// Path of the executable `name` would run, if any.
    pub fn which(&self, name: &str) -> Option<PathBuf> {
        crate::command::resolve(name, self.env.get("PATH").map(OsStr::new), &self.cwd)
            .into_path()
    }

    /// Add `dir` to the shell's `PATH` unless it is already an entry.
    pub fn add_to_path(
        &mut self,
        dir: impl AsRef<Path>,
        position: PathPosition,
    ) -> Result<&mut Self> {
        let dir = dir.as_ref();
        let current = self.get_env("PATH").unwrap_or_default();
        let mut entries: Vec<PathBuf> = if current.is_empty() {
            Vec::new()
        } else {
            std::env::split_paths(current).collect()
        };
        if entries.iter().any(|entry| entry == dir) {
            return Ok(self);
        }

        match position {
            PathPosition::Append => entries.push(dir.to_path_buf()),
            PathPosition::Prepend => entries.insert(0, dir.to_path_buf()),
        }
        let joined = std::env::join_paths(entries)
            .map_err(|e| PoshError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))?
            .into_string()
            .map_err(|_| {
                PoshError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "PATH is not valid UTF-8",
                ))
            })?;
        self.env.insert("PATH".to_string(), joined);
        Ok(self)
    }
}
