//! Redirection targets and their resolution into process handles.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use super::pipe::{anonymous_pipe, set_nonblocking};
use crate::error::PoshError;
use crate::Result;

/// One of the three standard streams of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdin,
    Stdout,
    Stderr,
}

impl Stream {
    /// Lowercase stream name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Stdin => "stdin",
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical source or destination selected for a stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// The shell's configured default for the stream.
    ///
    /// Only meaningful to the [`Shell`](crate::Shell), which substitutes its
    /// default before building a job.
    #[default]
    Default,
    /// `/dev/null`.
    Null,
    /// Capture output into memory, or feed input from [`Job::write`](super::Job::write).
    Variable,
    /// A file on disk. Output is appended when `append` is set and
    /// truncated otherwise; input is opened read-only. Relative paths are
    /// taken from the job's working directory.
    File { path: PathBuf, append: bool },
    /// The host process's own stdin, stdout or stderr.
    Inherit(Stream),
    /// Connected to the neighbouring pipeline stage.
    Pipe,
}

impl Target {
    /// A file target in append mode.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Target::File {
            path: path.into(),
            append: true,
        }
    }

    /// A file target that truncates on open.
    pub fn truncate(path: impl Into<PathBuf>) -> Self {
        Target::File {
            path: path.into(),
            append: false,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Default => f.write_str("default"),
            Target::Null => f.write_str("null"),
            Target::Variable => f.write_str("variable"),
            Target::File { path, .. } => write!(f, "file {}", path.display()),
            Target::Inherit(stream) => write!(f, "inherited {}", stream),
            Target::Pipe => f.write_str("pipe"),
        }
    }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Target::file(path)
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Target::file(path)
    }
}

impl From<&Path> for Target {
    fn from(path: &Path) -> Self {
        Target::file(path)
    }
}

impl From<PathBuf> for Target {
    fn from(path: PathBuf) -> Self {
        Target::file(path)
    }
}

/// Handles produced for one spawn.
///
/// The `Stdio` values go to the child. Everything else stays with the job.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
    /// Parent end of a `Variable` stdin.
    pub stdin_writer: Option<File>,
    /// Non-blocking read end of a `Variable` stdout.
    pub stdout_capture: Option<File>,
    /// Non-blocking read end of a `Variable` stderr.
    pub stderr_capture: Option<File>,
    /// Read end of a `Pipe` stdout/stderr, for the next stage.
    pub pipe_reader: Option<OwnedFd>,
}

fn invalid(stream: Stream, target: &Target) -> PoshError {
    PoshError::InvalidTarget {
        stream,
        target: target.to_string(),
    }
}

fn inherited(stream: Stream) -> io::Result<Stdio> {
    let fd = match stream {
        Stream::Stdin => io::stdin().as_fd().try_clone_to_owned()?,
        Stream::Stdout => io::stdout().as_fd().try_clone_to_owned()?,
        Stream::Stderr => io::stderr().as_fd().try_clone_to_owned()?,
    };
    Ok(Stdio::from(fd))
}

/// Resolve the three targets of a job into child handles.
///
/// `upstream` is the read end of the previous pipeline stage and is
/// consumed by a `Pipe` stdin. When stdout and stderr are both `Pipe` they
/// share one pipe. Relative file paths are joined onto `cwd`.
pub(crate) fn resolve(
    stdin: &Target,
    stdout: &Target,
    stderr: &Target,
    upstream: Option<OwnedFd>,
    cwd: &Path,
) -> Result<Resolved> {
    let mut stdin_writer = None;
    let stdin = match stdin {
        Target::Null => Stdio::null(),
        Target::Variable => {
            let (read, write) = anonymous_pipe()?;
            stdin_writer = Some(File::from(write));
            Stdio::from(read)
        }
        Target::File { path, .. } => Stdio::from(File::open(cwd.join(path))?),
        Target::Inherit(stream) => inherited(*stream)?,
        Target::Pipe => Stdio::from(upstream.ok_or(PoshError::PipeUnavailable)?),
        Target::Default => return Err(invalid(Stream::Stdin, stdin)),
    };

    let mut stdout_capture = None;
    let mut pipe_reader = None;
    let mut pipe_writer = None;
    let stdout = match stdout {
        Target::Pipe => {
            let (read, write) = anonymous_pipe()?;
            pipe_reader = Some(read);
            let handle = Stdio::from(write.try_clone()?);
            pipe_writer = Some(write);
            handle
        }
        other => output(Stream::Stdout, other, cwd, &mut stdout_capture)?,
    };

    let mut stderr_capture = None;
    let stderr = match stderr {
        Target::Pipe => match pipe_writer.take() {
            Some(shared) => Stdio::from(shared),
            None => {
                let (read, write) = anonymous_pipe()?;
                pipe_reader = Some(read);
                Stdio::from(write)
            }
        },
        other => output(Stream::Stderr, other, cwd, &mut stderr_capture)?,
    };

    Ok(Resolved {
        stdin,
        stdout,
        stderr,
        stdin_writer,
        stdout_capture,
        stderr_capture,
        pipe_reader,
    })
}

fn output(
    stream: Stream,
    target: &Target,
    cwd: &Path,
    capture: &mut Option<File>,
) -> Result<Stdio> {
    Ok(match target {
        Target::Null => Stdio::null(),
        Target::Variable => {
            let (read, write) = anonymous_pipe()?;
            set_nonblocking(&read)?;
            *capture = Some(File::from(read));
            Stdio::from(write)
        }
        Target::File { path, append } => {
            let mut options = OpenOptions::new();
            options.create(true);
            if *append {
                options.append(true);
            } else {
                options.write(true).truncate(true);
            }
            Stdio::from(options.open(cwd.join(path))?)
        }
        Target::Inherit(source) => inherited(*source)?,
        Target::Default | Target::Pipe => return Err(invalid(stream, target)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Default.to_string(), "default");
        assert_eq!(Target::file("/tmp/x").to_string(), "file /tmp/x");
        assert_eq!(Target::Inherit(Stream::Stderr).to_string(), "inherited stderr");
    }

    #[test]
    fn test_target_from_path_appends() {
        let target: Target = "afile".into();
        assert_eq!(
            target,
            Target::File {
                path: PathBuf::from("afile"),
                append: true
            }
        );
        assert!(matches!(Target::truncate("afile"), Target::File { append: false, .. }));
    }

    #[test]
    fn test_default_target_rejected() {
        let err = resolve(&Target::Default, &Target::Null, &Target::Null, None, Path::new("/")).unwrap_err();
        assert!(matches!(
            err,
            PoshError::InvalidTarget {
                stream: Stream::Stdin,
                ..
            }
        ));

        let err = resolve(&Target::Null, &Target::Null, &Target::Default, None, Path::new("/")).unwrap_err();
        assert!(matches!(
            err,
            PoshError::InvalidTarget {
                stream: Stream::Stderr,
                ..
            }
        ));
    }

    #[test]
    fn test_pipe_stdin_without_upstream() {
        let err = resolve(&Target::Pipe, &Target::Null, &Target::Null, None, Path::new("/")).unwrap_err();
        assert!(matches!(err, PoshError::PipeUnavailable));
    }

    #[test]
    fn test_variable_targets_keep_parent_ends() {
        let resolved =
            resolve(&Target::Variable, &Target::Variable, &Target::Variable, None, Path::new("/")).unwrap();
        assert!(resolved.stdin_writer.is_some());
        assert!(resolved.stdout_capture.is_some());
        assert!(resolved.stderr_capture.is_some());
        assert!(resolved.pipe_reader.is_none());
    }

    #[test]
    fn test_merged_pipe_has_one_reader() {
        let resolved = resolve(&Target::Null, &Target::Pipe, &Target::Pipe, None, Path::new("/")).unwrap();
        assert!(resolved.pipe_reader.is_some());
        assert!(resolved.stdout_capture.is_none());
    }

    #[test]
    fn test_file_output_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        resolve(&Target::Null, &Target::file(&path), &Target::Null, None, Path::new("/")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_relative_file_uses_cwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.txt"), "x").unwrap();
        resolve(
            &Target::file("in.txt"),
            &Target::truncate("out.txt"),
            &Target::file("err.txt"),
            None,
            dir.path(),
        )
        .unwrap();
        assert!(dir.path().join("out.txt").exists());
        assert!(dir.path().join("err.txt").exists());
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(
            &Target::file(dir.path().join("missing")),
            &Target::Null,
            &Target::Null,
            None,
            Path::new("/"),
        )
        .unwrap_err();
        assert!(matches!(err, PoshError::Io(_)));
    }
}
