//! In-memory capture of process output.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use tracing::trace;

/// Default buffer size for draining capture pipes.
const READ_BUFFER_SIZE: usize = 4096;

/// Parent end of a `Variable` output pipe plus everything read from it so
/// far.
///
/// The reader is non-blocking, so draining never stalls on a live producer.
/// It is dropped once end-of-file is seen, releasing the descriptor.
#[derive(Debug)]
pub(crate) struct CapturePipe {
    reader: Option<File>,
    buffer: Vec<u8>,
}

impl CapturePipe {
    pub fn new(reader: File) -> Self {
        Self {
            reader: Some(reader),
            buffer: Vec::new(),
        }
    }

    /// Move everything currently readable into the buffer.
    pub fn fill(&mut self) -> io::Result<()> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        let mut chunk = [0u8; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    trace!(bytes = self.buffer.len(), "capture reached end of file");
                    self.reader = None;
                    return Ok(());
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Take the whole buffer.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Take one `\n`-terminated line, or the unterminated tail once the
    /// writer side has closed.
    pub fn take_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            return Some(self.buffer.drain(..=pos).collect());
        }
        if self.reader.is_none() && !self.buffer.is_empty() {
            return Some(self.take());
        }
        None
    }

    /// Check if the writer side has closed and been fully read.
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

/// Captured output of a job, shaped by which streams were captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    /// Only stdout was captured.
    Stdout(String),
    /// Only stderr was captured.
    Stderr(String),
    /// Both streams were captured.
    Both { stdout: String, stderr: String },
}

impl Captured {
    pub(crate) fn from_parts(stdout: Option<String>, stderr: Option<String>) -> Option<Self> {
        match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => Some(Captured::Both { stdout, stderr }),
            (Some(stdout), None) => Some(Captured::Stdout(stdout)),
            (None, Some(stderr)) => Some(Captured::Stderr(stderr)),
            (None, None) => None,
        }
    }

    /// Captured stdout text, if stdout was captured.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Captured::Stdout(out) | Captured::Both { stdout: out, .. } => Some(out.as_str()),
            Captured::Stderr(_) => None,
        }
    }

    /// Captured stderr text, if stderr was captured.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Captured::Stderr(err) | Captured::Both { stderr: err, .. } => Some(err.as_str()),
            Captured::Stdout(_) => None,
        }
    }

    /// Lines of the captured text, stdout first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout()
            .into_iter()
            .chain(self.stderr())
            .flat_map(str::lines)
    }
}

impl fmt::Display for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Captured::Stdout(text) | Captured::Stderr(text) => f.write_str(text),
            Captured::Both { stdout, stderr } => {
                f.write_str(stdout)?;
                f.write_str(stderr)
            }
        }
    }
}

/// A single-stream capture compares equal to its text.
impl PartialEq<str> for Captured {
    fn eq(&self, other: &str) -> bool {
        match self {
            Captured::Stdout(text) | Captured::Stderr(text) => text == other,
            Captured::Both { .. } => false,
        }
    }
}

impl PartialEq<&str> for Captured {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::pipe::{anonymous_pipe, set_nonblocking};
    use std::io::Write;

    fn capture_pair() -> (CapturePipe, File) {
        let (read, write) = anonymous_pipe().unwrap();
        set_nonblocking(&read).unwrap();
        (CapturePipe::new(File::from(read)), File::from(write))
    }

    #[test]
    fn test_fill_without_data_does_not_block() {
        let (mut capture, _writer) = capture_pair();
        capture.fill().unwrap();
        assert!(capture.take().is_empty());
        assert!(!capture.is_closed());
    }

    #[test]
    fn test_fill_until_eof_releases_reader() {
        let (mut capture, mut writer) = capture_pair();
        writer.write_all(b"partial").unwrap();
        capture.fill().unwrap();
        assert_eq!(capture.take(), b"partial");

        writer.write_all(b" rest").unwrap();
        drop(writer);
        capture.fill().unwrap();
        assert!(capture.is_closed());
        assert_eq!(capture.take(), b" rest");
    }

    #[test]
    fn test_take_line() {
        let (mut capture, mut writer) = capture_pair();
        writer.write_all(b"one\ntwo\nthr").unwrap();
        capture.fill().unwrap();

        assert_eq!(capture.take_line(), Some(b"one\n".to_vec()));
        assert_eq!(capture.take_line(), Some(b"two\n".to_vec()));
        // Unterminated tail is held back while the writer is open
        assert_eq!(capture.take_line(), None);

        drop(writer);
        capture.fill().unwrap();
        assert_eq!(capture.take_line(), Some(b"thr".to_vec()));
        assert_eq!(capture.take_line(), None);
    }

    #[test]
    fn test_captured_from_parts() {
        assert_eq!(
            Captured::from_parts(Some("o".into()), None),
            Some(Captured::Stdout("o".into()))
        );
        assert_eq!(
            Captured::from_parts(None, Some("e".into())),
            Some(Captured::Stderr("e".into()))
        );
        assert_eq!(
            Captured::from_parts(Some("o".into()), Some("e".into())),
            Some(Captured::Both {
                stdout: "o".into(),
                stderr: "e".into()
            })
        );
        assert_eq!(Captured::from_parts(None, None), None);
    }

    #[test]
    fn test_captured_compare_and_lines() {
        let out = Captured::Stdout("hi\n".into());
        assert_eq!(out, "hi\n");
        assert_eq!(out.stderr(), None);

        let both = Captured::Both {
            stdout: "a\nb\n".into(),
            stderr: "c\n".into(),
        };
        assert_ne!(both, "a\nb\n");
        assert_eq!(both.lines().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(both.to_string(), "a\nb\nc\n");
    }
}
