//! Result of invoking a command through the shell.

use std::ffi::OsStr;
use std::path::Path;

use super::Shell;
use crate::error::PoshError;
use crate::job::{Captured, Job, Stream, Target};
use crate::Result;

/// What an invocation produced.
///
/// Foreground commands hand back the shell itself so calls can be chained,
/// unless output was captured, in which case the captured value replaces
/// it. Background commands hand back their [`Job`].
#[derive(Debug)]
pub enum Outcome<'a> {
    /// The shell facade, for further chaining.
    Shell(&'a mut Shell),
    /// Output captured from the command.
    Captured(Captured),
    /// A background job the caller must wait on.
    Job(Job),
}

impl<'a> Outcome<'a> {
    /// Truthiness: the shell's last exit code was 0.
    ///
    /// A captured value or a job handle is always truthy.
    pub fn ok(&self) -> bool {
        match self {
            Outcome::Shell(shell) => shell.ok(),
            Outcome::Captured(_) | Outcome::Job(_) => true,
        }
    }

    /// Exit code recorded on the shell, when this is the shell.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Outcome::Shell(shell) => Some(shell.exit_code()),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Outcome::Shell(_) => "shell",
            Outcome::Captured(_) => "captured value",
            Outcome::Job(_) => "background job",
        }
    }

    /// Get the shell back, failing on a captured value or job.
    pub fn shell(self) -> Result<&'a mut Shell> {
        match self {
            Outcome::Shell(shell) => Ok(shell),
            other => Err(PoshError::NotChainable(other.kind())),
        }
    }

    pub fn captured(&self) -> Option<&Captured> {
        match self {
            Outcome::Captured(captured) => Some(captured),
            _ => None,
        }
    }

    pub fn into_captured(self) -> Option<Captured> {
        match self {
            Outcome::Captured(captured) => Some(captured),
            _ => None,
        }
    }

    pub fn into_job(self) -> Option<Job> {
        match self {
            Outcome::Job(job) => Some(job),
            _ => None,
        }
    }

    /// Chain another command. See [`Shell::run`].
    pub fn run<I, S>(self, name: &str, args: I) -> Result<Outcome<'a>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.shell()?.run(name, args)
    }

    /// See [`Shell::end`].
    pub fn end(self) -> Result<Outcome<'a>> {
        self.shell()?.end()
    }

    /// See [`Shell::var`].
    pub fn var(self, streams: &[Stream]) -> Result<&'a mut Shell> {
        Ok(self.shell()?.var(streams))
    }

    /// See [`Shell::null`].
    pub fn null(self, streams: &[Stream]) -> Result<&'a mut Shell> {
        Ok(self.shell()?.null(streams))
    }

    /// See [`Shell::pipe`].
    pub fn pipe(self, streams: &[Stream]) -> Result<&'a mut Shell> {
        Ok(self.shell()?.pipe(streams))
    }

    /// See [`Shell::bg`].
    pub fn bg(self) -> Result<&'a mut Shell> {
        Ok(self.shell()?.bg())
    }

    /// See [`Shell::redir`].
    pub fn redir(
        self,
        stdin: Option<Target>,
        stdout: Option<Target>,
        stderr: Option<Target>,
    ) -> Result<&'a mut Shell> {
        self.shell()?.redir(stdin, stdout, stderr)
    }

    /// See [`Shell::cd`].
    pub fn cd(self, path: impl AsRef<Path>) -> Result<&'a mut Shell> {
        Ok(self.shell()?.cd(path))
    }
}
