//! Spawned processes and their I/O.
//!
//! A [`Job`] wraps one OS process. It owns a snapshot of the environment and
//! working directory it was built with, the [`Target`] chosen for each
//! standard stream, and whatever parent-side handles those targets need
//! after spawning (capture pipes, a stdin writer, the output end handed to
//! the next pipeline stage).
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use posh::job::{Job, Stream, Target};
//!
//! let mut job = Job::new("/bin/echo", ["hi"], HashMap::new(), "/")
//!     .with_target(Stream::Stdin, Target::Null)
//!     .with_target(Stream::Stdout, Target::Variable)
//!     .with_target(Stream::Stderr, Target::Null);
//! job.start()?;
//! job.wait()?;
//! assert_eq!(job.read_text(Stream::Stdout)?, "hi\n");
//! # Ok::<(), posh::PoshError>(())
//! ```

mod capture;
mod pipe;
mod redirect;
mod status;

pub use capture::Captured;
pub use redirect::{Stream, Target};
pub use status::JobStatus;

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::Duration;

use tracing::{debug, warn};

use capture::CapturePipe;
use crate::error::PoshError;
use crate::Result;

/// How long `wait` sleeps between polls while draining captured output.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct Captures {
    stdout: Option<CapturePipe>,
    stderr: Option<CapturePipe>,
}

impl Captures {
    fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }

    fn fill(&mut self) -> io::Result<()> {
        if let Some(capture) = self.stdout.as_mut() {
            capture.fill()?;
        }
        if let Some(capture) = self.stderr.as_mut() {
            capture.fill()?;
        }
        Ok(())
    }
}

/// One OS process with its resolved I/O and lifecycle status.
#[derive(Debug)]
pub struct Job {
    path: PathBuf,
    args: Vec<OsString>,
    env: HashMap<String, String>,
    cwd: PathBuf,
    stdin: Target,
    stdout: Target,
    stderr: Target,
    /// Output end of the previous pipeline stage, consumed at spawn.
    upstream_reader: Option<OwnedFd>,
    /// Earlier pipeline stages, reaped after this job.
    upstream: Vec<Job>,
    child: Option<Child>,
    status: JobStatus,
    stdin_writer: Option<File>,
    captures: Captures,
    /// Output end of a `Pipe` stdout/stderr, taken by the next stage.
    pipe_reader: Option<OwnedFd>,
}

impl Job {
    /// Create an unstarted job.
    ///
    /// `env` and `cwd` are copied in; later changes to the values they came
    /// from do not affect the job. All streams start inherited from the
    /// host process.
    pub fn new<I, S>(
        path: impl Into<PathBuf>,
        args: I,
        env: HashMap<String, String>,
        cwd: impl Into<PathBuf>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            path: path.into(),
            args: args.into_iter().map(|a| a.as_ref().to_os_string()).collect(),
            env,
            cwd: cwd.into(),
            stdin: Target::Inherit(Stream::Stdin),
            stdout: Target::Inherit(Stream::Stdout),
            stderr: Target::Inherit(Stream::Stderr),
            upstream_reader: None,
            upstream: Vec::new(),
            child: None,
            status: JobStatus::Unstarted,
            stdin_writer: None,
            captures: Captures::default(),
            pipe_reader: None,
        }
    }

    /// Set the target of a stream.
    pub fn with_target(mut self, stream: Stream, target: Target) -> Self {
        self.set_target(stream, target);
        self
    }

    /// Set the target of a stream.
    ///
    /// Has no effect on a job that has already been started.
    pub fn set_target(&mut self, stream: Stream, target: Target) {
        match stream {
            Stream::Stdin => self.stdin = target,
            Stream::Stdout => self.stdout = target,
            Stream::Stderr => self.stderr = target,
        }
    }

    /// Get the target of a stream.
    pub fn target(&self, stream: Stream) -> &Target {
        match stream {
            Stream::Stdin => &self.stdin,
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Process ID, once started.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Exit code, once finished.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.exit_code()
    }

    /// Number of earlier pipeline stages owned by this job.
    pub fn upstream_len(&self) -> usize {
        self.upstream.len()
    }

    /// Process IDs of the started earlier pipeline stages.
    pub fn upstream_pids(&self) -> Vec<u32> {
        self.upstream.iter().filter_map(Job::pid).collect()
    }

    /// Connect this job's stdin to the output of `upstream`.
    ///
    /// The upstream job is started first so its output pipe exists, then
    /// becomes owned by this job and is reaped by [`wait`](Self::wait).
    pub(crate) fn connect_upstream(&mut self, mut upstream: Job) -> Result<()> {
        if let Err(e) = upstream.start() {
            upstream.abandon();
            return Err(e);
        }
        let Some(reader) = upstream.pipe_reader.take() else {
            upstream.abandon();
            return Err(PoshError::PipeUnavailable);
        };
        self.upstream_reader = Some(reader);
        self.stdin = Target::Pipe;

        let mut stages = std::mem::take(&mut upstream.upstream);
        stages.push(upstream);
        self.upstream = stages;
        Ok(())
    }

    /// Kill and reap this job and its earlier pipeline stages.
    ///
    /// Used for a pipeline that will never be finished, so no stage is left
    /// behind as an unreaped process.
    pub(crate) fn abandon(&mut self) {
        self.upstream_reader = None;
        self.stdin_writer = None;
        self.kill();
        for stage in &mut self.upstream {
            stage.kill();
        }
        if let Err(e) = self.wait() {
            warn!(error = %e, path = %self.path.display(), "failed to reap abandoned pipeline");
        }
    }

    fn kill(&mut self) {
        if !self.status.is_running() {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill() {
                debug!(pid = child.id(), error = %e, "kill failed");
            }
        }
    }

    /// Spawn the process.
    ///
    /// Only an unstarted job is spawned; calling this on a running or
    /// finished job does nothing. Handles opened only for the child (files,
    /// the child's ends of pipes) are closed in this process as soon as the
    /// spawn returns.
    pub fn start(&mut self) -> Result<()> {
        if self.status != JobStatus::Unstarted {
            return Ok(());
        }

        let resolved = redirect::resolve(
            &self.stdin,
            &self.stdout,
            &self.stderr,
            self.upstream_reader.take(),
            &self.cwd,
        )?;

        let mut command = Command::new(&self.path);
        command
            .args(&self.args)
            .env_clear()
            .envs(&self.env)
            .current_dir(&self.cwd)
            .stdin(resolved.stdin)
            .stdout(resolved.stdout)
            .stderr(resolved.stderr);

        let child = command.spawn().map_err(|source| PoshError::Spawn {
            path: self.path.clone(),
            source,
        })?;
        // Dropping the command closes this process's copies of the child's
        // handles, so readers see EOF when the child exits.
        drop(command);

        debug!(
            pid = child.id(),
            path = %self.path.display(),
            stdin = %self.stdin,
            stdout = %self.stdout,
            stderr = %self.stderr,
            "job started"
        );

        self.stdin_writer = resolved.stdin_writer;
        self.captures.stdout = resolved.stdout_capture.map(CapturePipe::new);
        self.captures.stderr = resolved.stderr_capture.map(CapturePipe::new);
        self.pipe_reader = resolved.pipe_reader;
        self.child = Some(child);
        self.status.transition_to(JobStatus::Running)
    }

    fn finish(&mut self, exit: ExitStatus) -> Result<()> {
        let code = exit
            .code()
            .unwrap_or_else(|| 128 + exit.signal().unwrap_or(0));
        debug!(pid = self.pid(), code, "job finished");
        self.status.transition_to(JobStatus::Finished(code))
    }

    /// Poll the job without blocking.
    ///
    /// Captured output produced so far is drained into memory as a side
    /// effect, so a polled background job never stalls on a full pipe.
    pub fn status(&mut self) -> Result<JobStatus> {
        self.captures.fill()?;
        if self.status.is_running() {
            let exited = match self.child.as_mut() {
                Some(child) => child.try_wait()?,
                None => None,
            };
            if let Some(exit) = exited {
                self.finish(exit)?;
                self.captures.fill()?;
            }
        }
        Ok(self.status)
    }

    /// Block until the job has finished.
    ///
    /// A `Variable` stdin is closed first so the process sees end of input.
    /// Captured output is drained while waiting. Earlier pipeline stages
    /// are reaped afterwards. Returns immediately for an unstarted or
    /// finished job.
    pub fn wait(&mut self) -> Result<JobStatus> {
        self.stdin_writer = None;

        if self.status.is_running() {
            if let Some(child) = self.child.as_mut() {
                let exit = if self.captures.is_empty() {
                    child.wait()?
                } else {
                    loop {
                        self.captures.fill()?;
                        if let Some(exit) = child.try_wait()? {
                            break exit;
                        }
                        std::thread::sleep(POLL_INTERVAL);
                    }
                };
                self.finish(exit)?;
            }
        }
        self.captures.fill()?;

        for stage in &mut self.upstream {
            stage.wait()?;
        }
        Ok(self.status)
    }

    fn capture_mut(&mut self, stream: Stream) -> Result<&mut CapturePipe> {
        let capture = match stream {
            Stream::Stdout => self.captures.stdout.as_mut(),
            Stream::Stderr => self.captures.stderr.as_mut(),
            Stream::Stdin => None,
        };
        capture.ok_or(PoshError::NotCaptured(stream))
    }

    /// Read all captured bytes available so far from `stream`.
    ///
    /// Never blocks: a running job may yield nothing yet.
    pub fn read(&mut self, stream: Stream) -> Result<Vec<u8>> {
        self.status()?;
        Ok(self.capture_mut(stream)?.take())
    }

    /// Like [`read`](Self::read), decoded as UTF-8 (lossily).
    pub fn read_text(&mut self, stream: Stream) -> Result<String> {
        let bytes = self.read(stream)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read one line (with its terminator) from `stream`, if a full line is
    /// available or the stream has closed with a partial one.
    pub fn read_line(&mut self, stream: Stream) -> Result<Option<String>> {
        self.status()?;
        Ok(self
            .capture_mut(stream)?
            .take_line()
            .map(|line| String::from_utf8_lossy(&line).into_owned()))
    }

    /// Read all available lines from `stream`, without terminators.
    pub fn read_lines(&mut self, stream: Stream) -> Result<Vec<String>> {
        let text = self.read_text(stream)?;
        Ok(text.lines().map(str::to_string).collect())
    }

    /// Take the combined captured output.
    ///
    /// Shaped by which streams were captured; `None` when neither was.
    pub fn var(&mut self) -> Result<Option<Captured>> {
        self.status()?;
        let stdout = self
            .captures
            .stdout
            .as_mut()
            .map(|c| String::from_utf8_lossy(&c.take()).into_owned());
        let stderr = self
            .captures
            .stderr
            .as_mut()
            .map(|c| String::from_utf8_lossy(&c.take()).into_owned());
        Ok(Captured::from_parts(stdout, stderr))
    }

    /// Write to the process's stdin and flush.
    ///
    /// Only valid when stdin targets [`Target::Variable`].
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
        if self.stdin != Target::Variable {
            return Err(PoshError::NotCaptured(Stream::Stdin));
        }
        let writer = self.stdin_writer.as_mut().ok_or_else(|| {
            PoshError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "stdin is not open"))
        })?;
        writer.write_all(data.as_ref())?;
        writer.flush()?;
        Ok(())
    }

    /// Close a `Variable` stdin, signalling end of input.
    pub fn close_stdin(&mut self) {
        self.stdin_writer = None;
    }
}
