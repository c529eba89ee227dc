//! Builder state carried between invocations.

use tracing::{trace, warn};

use crate::job::{Job, Stream, Target};
use crate::Result;

/// Per-stream targets the shell falls back to after each execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Defaults {
    pub stdin: Target,
    pub stdout: Target,
    pub stderr: Target,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            stdin: Target::Inherit(Stream::Stdin),
            stdout: Target::Inherit(Stream::Stdout),
            stderr: Target::Inherit(Stream::Stderr),
        }
    }
}

impl Defaults {
    pub fn get(&self, stream: Stream) -> &Target {
        match stream {
            Stream::Stdin => &self.stdin,
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }
}

#[derive(Debug, Default)]
enum Mode {
    #[default]
    Idle,
    /// Between `pipe()` and `end()`.
    BuildingPipe {
        stdout: bool,
        stderr: bool,
        /// Last staged job. Not started until the next stage connects to
        /// it or `end()` runs it.
        staged: Option<Job>,
    },
}

/// Pending targets, background flag and pipe mode of a shell.
#[derive(Debug)]
pub(crate) struct PipelineState {
    stdin: Target,
    stdout: Target,
    stderr: Target,
    background: bool,
    mode: Mode,
}

/// Intermediate stages never capture: a `Variable` falls back to the
/// default so only the final stage yields a value.
fn intermediate(pending: &Target, default: &Target) -> Target {
    if *pending == Target::Variable {
        default.clone()
    } else {
        pending.clone()
    }
}

impl PipelineState {
    pub fn new(defaults: &Defaults) -> Self {
        Self {
            stdin: defaults.stdin.clone(),
            stdout: defaults.stdout.clone(),
            stderr: defaults.stderr.clone(),
            background: false,
            mode: Mode::Idle,
        }
    }

    pub fn pending(&self, stream: Stream) -> &Target {
        match stream {
            Stream::Stdin => &self.stdin,
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    pub fn set_pending(&mut self, stream: Stream, target: Target) {
        match stream {
            Stream::Stdin => self.stdin = target,
            Stream::Stdout => self.stdout = target,
            Stream::Stderr => self.stderr = target,
        }
    }

    pub fn set_background(&mut self) {
        self.background = true;
    }

    /// Read and clear the background flag.
    pub fn take_background(&mut self) -> bool {
        std::mem::take(&mut self.background)
    }

    pub fn is_piping(&self) -> bool {
        matches!(self.mode, Mode::BuildingPipe { .. })
    }

    /// Return pending targets and the background flag to their defaults.
    ///
    /// Only called while idle; a pipeline under construction keeps its
    /// state until `end()`.
    pub fn reset(&mut self, defaults: &Defaults) {
        debug_assert!(!self.is_piping());
        self.stdin = defaults.stdin.clone();
        self.stdout = defaults.stdout.clone();
        self.stderr = defaults.stderr.clone();
        self.background = false;
        trace!("builder state reset");
    }

    /// Start building a pipeline, discarding any stale staged job.
    pub fn enter_pipe(&mut self, stdout: bool, stderr: bool) {
        self.discard_staged();
        self.mode = Mode::BuildingPipe {
            stdout: stdout || !stderr,
            stderr,
            staged: None,
        };
    }

    /// Kill and reap a staged pipeline that will never reach `end()`.
    fn discard_staged(&mut self) {
        if let Mode::BuildingPipe {
            staged: Some(stale),
            ..
        } = &mut self.mode
        {
            warn!(path = %stale.path().display(), "discarding unfinished pipeline");
            stale.abandon();
        }
    }

    /// Leave pipe mode, handing back the last staged job.
    pub fn leave_pipe(&mut self) -> Option<Job> {
        match std::mem::take(&mut self.mode) {
            Mode::BuildingPipe { staged, .. } => staged,
            Mode::Idle => None,
        }
    }

    /// Stage `job` as the next pipeline step.
    ///
    /// The previously staged job is started and its output connected to
    /// `job`'s stdin. When no pipeline is being built the job is handed
    /// back for direct execution.
    pub fn stage(&mut self, mut job: Job, defaults: &Defaults) -> Result<Option<Job>> {
        let Mode::BuildingPipe {
            stdout,
            stderr,
            staged,
        } = &mut self.mode
        else {
            return Ok(Some(job));
        };

        let out = if *stdout {
            Target::Pipe
        } else {
            intermediate(&self.stdout, &defaults.stdout)
        };
        let err = if *stderr {
            Target::Pipe
        } else {
            intermediate(&self.stderr, &defaults.stderr)
        };
        job.set_target(Stream::Stdout, out);
        job.set_target(Stream::Stderr, err);

        match staged.take() {
            Some(previous) => {
                if let Err(e) = job.connect_upstream(previous) {
                    warn!(error = %e, "pipeline stage failed to start, leaving pipe mode");
                    self.mode = Mode::Idle;
                    self.reset(defaults);
                    return Err(e);
                }
            }
            None => job.set_target(
                Stream::Stdin,
                intermediate(&self.stdin, &defaults.stdin),
            ),
        }
        trace!(path = %job.path().display(), "pipeline stage staged");
        *staged = Some(job);
        Ok(None)
    }
}

impl Drop for PipelineState {
    fn drop(&mut self) {
        self.discard_staged();
    }
}
