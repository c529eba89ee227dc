//! Command lookup.
//!
//! Names are resolved against the shell's own `PATH` on every call, so a
//! change to the search path takes effect immediately.

mod resolver;

pub use resolver::{resolve, Resolution};

use std::ffi::OsStr;
use std::path::Path;

use crate::shell::{Outcome, Shell};
use crate::Result;

/// A command name looked up on a shell, ready to invoke.
///
/// Testing [`ok`](Self::ok) does not run anything, so the presence of a
/// command can be checked up front. Invoking an unresolved command records
/// exit code 1 on the shell instead of failing.
#[derive(Debug)]
pub struct CommandRef<'a> {
    shell: &'a mut Shell,
    name: String,
    resolution: Resolution,
}

impl<'a> CommandRef<'a> {
    pub(crate) fn new(shell: &'a mut Shell, name: &str, resolution: Resolution) -> Self {
        Self {
            shell,
            name: name.to_string(),
            resolution,
        }
    }

    /// Check if the command resolved to an executable.
    pub fn ok(&self) -> bool {
        self.resolution.ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved executable path.
    pub fn path(&self) -> Option<&Path> {
        self.resolution.path()
    }

    /// Run the command with `args`.
    pub fn invoke<I, S>(self, args: I) -> Result<Outcome<'a>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let CommandRef {
            shell,
            name,
            resolution,
        } = self;
        match resolution {
            Resolution::Found(path) => shell.dispatch(path, args),
            Resolution::NotFound(_) => Ok(shell.command_not_found(&name)),
        }
    }
}
