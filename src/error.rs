//! Error types for posh.

use std::path::PathBuf;

use thiserror::Error;

use crate::job::Stream;

/// Main error type for posh operations.
///
/// Failures a shell script would report through `$?` (unknown commands,
/// a refused `cd`) are not errors; they are recorded on the
/// [`Shell`](crate::Shell) as an exit code and message. The variants here
/// are host-level faults reported at the call site.
#[derive(Error, Debug)]
pub enum PoshError {
    /// A target was used on a stream or in a place where it has no
    /// concrete handle.
    #[error("invalid redirection target for {stream}: {target}")]
    InvalidTarget { stream: Stream, target: String },

    /// A command or builder call was chained onto a value that is not the
    /// shell facade.
    #[error("cannot chain onto a {0}; only the shell facade is chainable")]
    NotChainable(&'static str),

    /// A capture accessor was used on a stream that was not captured.
    #[error("{0} was not redirected to a variable")]
    NotCaptured(Stream),

    /// The executable could not be spawned.
    #[error("failed to spawn {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid job status transition attempted.
    #[error("invalid job transition from {from} to {to}")]
    InvalidTransition {
        from: crate::job::JobStatus,
        to: crate::job::JobStatus,
    },

    /// A pipeline stage has no output pipe to connect the next stage to.
    #[error("previous pipeline stage has no output pipe")]
    PipeUnavailable,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for posh operations.
pub type Result<T> = std::result::Result<T, PoshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_target_display() {
        let err = PoshError::InvalidTarget {
            stream: Stream::Stdin,
            target: "pipe".into(),
        };
        assert!(err.to_string().contains("stdin"));
        assert!(err.to_string().contains("pipe"));
    }

    #[test]
    fn test_not_chainable_display() {
        let err = PoshError::NotChainable("captured value");
        assert!(err.to_string().contains("captured value"));
    }

    #[test]
    fn test_not_captured_display() {
        let err = PoshError::NotCaptured(Stream::Stderr);
        assert_eq!(err.to_string(), "stderr was not redirected to a variable");
    }

    #[test]
    fn test_spawn_display() {
        let err = PoshError::Spawn {
            path: PathBuf::from("/bin/gone"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/bin/gone"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PoshError = io_err.into();
        assert!(matches!(err, PoshError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
