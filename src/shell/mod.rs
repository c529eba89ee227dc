//! The shell facade.
//!
//! [`Shell`] holds the environment, working directory and last exit status
//! of a scripted session, plus the builder state (pending redirections,
//! pipe mode, background flag) consumed by the next command.
//!
//! # Example
//!
//! ```no_run
//! use posh::{Shell, Stream, NO_ARGS};
//!
//! let mut sh = Shell::new()?;
//!
//! // Capture stdout of a single command
//! let hi = sh.var(&[]).run("echo", ["hi"])?.into_captured();
//! assert_eq!(hi.unwrap(), "hi\n");
//!
//! // Pipe two commands and capture the last one's output
//! let out = sh
//!     .pipe(&[Stream::Stdout])
//!     .run("echo", ["hi"])?
//!     .run("cat", NO_ARGS)?
//!     .var(&[])?
//!     .end()?;
//! assert_eq!(out.into_captured().unwrap(), "hi\n");
//!
//! // Statuses compose like a shell's
//! let failed = !sh.run("false", NO_ARGS)?.ok();
//! let recovered = sh.run("true", NO_ARGS)?.ok();
//! assert!(failed && recovered);
//! # Ok::<(), posh::PoshError>(())
//! ```

mod builtins;
mod outcome;
mod pipeline;

pub use builtins::PathPosition;
pub use outcome::Outcome;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::CommandRef;
use crate::error::PoshError;
use crate::job::{Job, Stream, Target};
use crate::Result;
use pipeline::{Defaults, PipelineState};

/// An empty argument list, for commands run without arguments.
pub const NO_ARGS: [&str; 0] = [];

/// A scripted shell session.
#[derive(Debug)]
pub struct Shell {
    cwd: PathBuf,
    env: HashMap<String, String>,
    exit_code: i32,
    error: String,
    defaults: Defaults,
    state: PipelineState,
}

impl Shell {
    /// Create a shell from the current process's directory and environment.
    ///
    /// Environment entries that are not valid UTF-8 are skipped.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Ok(Self::with_env(cwd, env))
    }

    /// Create a shell with an explicit working directory and environment.
    pub fn with_env(cwd: impl Into<PathBuf>, env: HashMap<String, String>) -> Self {
        let defaults = Defaults::default();
        Self {
            cwd: cwd.into(),
            env,
            exit_code: 0,
            error: String::new(),
            state: PipelineState::new(&defaults),
            defaults,
        }
    }

    /// Current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the environment variables.
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Get a specific environment variable.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(|s| s.as_str())
    }

    /// Set an environment variable.
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Remove an environment variable.
    pub fn remove_env(&mut self, key: &str) -> Option<String> {
        self.env.remove(key)
    }

    /// Exit code of the last command or builtin.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Message left by the last failing builtin, empty otherwise.
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Check if the last command or builtin succeeded.
    pub fn ok(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if a pipeline is being built.
    pub fn is_piping(&self) -> bool {
        self.state.is_piping()
    }

    /// Pending target for `stream`.
    pub fn pending(&self, stream: Stream) -> &Target {
        self.state.pending(stream)
    }

    pub(crate) fn builtin_response(&mut self, status: i32, error: impl Into<String>) {
        self.exit_code = status;
        self.error = error.into();
    }

    fn check_target(stream: Stream, target: &Target) -> Result<()> {
        if *target == Target::Pipe {
            return Err(PoshError::InvalidTarget {
                stream,
                target: target.to_string(),
            });
        }
        Ok(())
    }

    /// Set pending targets for the next command.
    ///
    /// `None` leaves a stream unchanged and [`Target::Default`] resets it to
    /// the shell's default. [`Target::Pipe`] is rejected; use
    /// [`pipe`](Self::pipe).
    pub fn redir(
        &mut self,
        stdin: Option<Target>,
        stdout: Option<Target>,
        stderr: Option<Target>,
    ) -> Result<&mut Self> {
        let targets = [
            (Stream::Stdin, stdin),
            (Stream::Stdout, stdout),
            (Stream::Stderr, stderr),
        ];
        for (stream, target) in &targets {
            if let Some(target) = target {
                Self::check_target(*stream, target)?;
            }
        }
        for (stream, target) in targets {
            match target {
                Some(Target::Default) => {
                    let default = self.defaults.get(stream).clone();
                    self.state.set_pending(stream, default);
                }
                Some(target) => self.state.set_pending(stream, target),
                None => {}
            }
        }
        Ok(self)
    }

    /// Replace the per-stream defaults.
    ///
    /// While idle the pending targets are reset to the new defaults too.
    pub fn set_defaults(&mut self, stdin: Target, stdout: Target, stderr: Target) -> Result<&mut Self> {
        for (stream, target) in [
            (Stream::Stdin, &stdin),
            (Stream::Stdout, &stdout),
            (Stream::Stderr, &stderr),
        ] {
            Self::check_target(stream, target)?;
            if *target == Target::Default {
                return Err(PoshError::InvalidTarget {
                    stream,
                    target: target.to_string(),
                });
            }
        }
        self.defaults = Defaults {
            stdin,
            stdout,
            stderr,
        };
        if !self.state.is_piping() {
            for stream in [Stream::Stdin, Stream::Stdout, Stream::Stderr] {
                self.state
                    .set_pending(stream, self.defaults.get(stream).clone());
            }
        }
        Ok(self)
    }

    fn set_each(&mut self, streams: &[Stream], fallback: &[Stream], target: Target) -> &mut Self {
        let streams = if streams.is_empty() { fallback } else { streams };
        for stream in streams {
            self.state.set_pending(*stream, target.clone());
        }
        self
    }

    /// Discard the given streams. Defaults to stdout and stderr.
    ///
    /// A discarded stdin reads from `/dev/null`.
    pub fn null(&mut self, streams: &[Stream]) -> &mut Self {
        self.set_each(streams, &[Stream::Stdout, Stream::Stderr], Target::Null)
    }

    /// Capture the given streams. Defaults to stdout only.
    ///
    /// A captured stdin is fed through [`Job::write`] on a background job.
    pub fn var(&mut self, streams: &[Stream]) -> &mut Self {
        self.set_each(streams, &[Stream::Stdout], Target::Variable)
    }

    /// Run the next command in the background, returning its [`Job`].
    pub fn bg(&mut self) -> &mut Self {
        self.state.set_background();
        self
    }

    /// Start a pipeline. Defaults to piping stdout.
    ///
    /// Piping both streams merges them into the next stage's stdin.
    /// Commands run until [`end`](Self::end) are staged instead of waited
    /// on.
    pub fn pipe(&mut self, streams: &[Stream]) -> &mut Self {
        let stdout = streams.is_empty() || streams.contains(&Stream::Stdout);
        let stderr = streams.contains(&Stream::Stderr);
        self.state.enter_pipe(stdout, stderr);
        self
    }

    /// Finish a pipeline and execute its last stage.
    ///
    /// Pending stdout and stderr targets apply to the last stage only. With
    /// no staged command this just leaves pipe mode.
    pub fn end(&mut self) -> Result<Outcome<'_>> {
        let Some(mut job) = self.state.leave_pipe() else {
            return Ok(Outcome::Shell(self));
        };
        job.set_target(Stream::Stdout, self.state.pending(Stream::Stdout).clone());
        job.set_target(Stream::Stderr, self.state.pending(Stream::Stderr).clone());
        self.execute(job)
    }

    /// Look up a command without running it.
    pub fn command(&mut self, name: &str) -> CommandRef<'_> {
        let resolution = crate::command::resolve(
            name,
            self.env.get("PATH").map(OsStr::new),
            &self.cwd,
        );
        CommandRef::new(self, name, resolution)
    }

    /// Run a command by name.
    ///
    /// Inside a pipeline the command is staged and the shell returned.
    /// Otherwise it runs to completion (or in the background after
    /// [`bg`](Self::bg)). An unknown name sets exit code 1 rather than
    /// failing.
    pub fn run<I, S>(&mut self, name: &str, args: I) -> Result<Outcome<'_>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command(name).invoke(args)
    }

    pub(crate) fn command_not_found(&mut self, name: &str) -> Outcome<'_> {
        debug!(name, "command not found");
        self.builtin_response(1, format!("command not found: {}", name));
        if !self.state.is_piping() {
            self.state.take_background();
            self.state.reset(&self.defaults);
        }
        Outcome::Shell(self)
    }

    pub(crate) fn dispatch<I, S>(&mut self, path: PathBuf, args: I) -> Result<Outcome<'_>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut job = Job::new(path, args, self.env.clone(), self.cwd.clone());
        for stream in [Stream::Stdin, Stream::Stdout, Stream::Stderr] {
            job.set_target(stream, self.state.pending(stream).clone());
        }
        match self.state.stage(job, &self.defaults)? {
            None => Ok(Outcome::Shell(self)),
            Some(job) => self.execute(job),
        }
    }

    /// Start `job`, then either hand it back (background) or wait for it
    /// and record its status. Builder state is reset either way.
    fn execute(&mut self, mut job: Job) -> Result<Outcome<'_>> {
        let background = self.state.take_background();
        let started = job.start();
        self.state.reset(&self.defaults);
        started?;

        if background {
            debug!(pid = job.pid(), path = %job.path().display(), "running in background");
            return Ok(Outcome::Job(job));
        }

        let status = job.wait()?;
        self.exit_code = status.exit_code().unwrap_or_default();
        self.error.clear();
        match job.var()? {
            Some(captured) => Ok(Outcome::Captured(captured)),
            None => Ok(Outcome::Shell(self)),
        }
    }
}
