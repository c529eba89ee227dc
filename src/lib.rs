//! # posh
//!
//! Fluent builder for running programs the way a shell script would,
//! without going through a shell.
//!
//! Commands are looked up on the shell's own `PATH`, then spawned directly
//! with redirections, pipelines, output capture and background execution
//! configured through chained calls.
//!
//! ## Features
//!
//! - **Redirection**: Files, `/dev/null`, in-memory capture or the host's streams
//! - **Pipelines**: Connect stdout and/or stderr of one stage to the next stage's stdin
//! - **Background jobs**: Poll, wait, write to stdin and read captured output
//! - **Builtins**: `cd`, `which` and `PATH` editing without spawning anything
//!
//! ## Quick Start
//!
//! ```no_run
//! use posh::{Shell, Stream, Target, NO_ARGS};
//!
//! fn main() -> posh::Result<()> {
//!     // Initialize logging
//!     posh::logging::try_init().ok();
//!
//!     let mut sh = Shell::new()?;
//!
//!     // ls -l >> listing.txt
//!     sh.redir(None, Some(Target::file("listing.txt")), None)?
//!         .run("ls", ["-l"])?;
//!
//!     // echo hi | tr a-z A-Z, captured
//!     let upper = sh
//!         .pipe(&[Stream::Stdout])
//!         .run("echo", ["hi"])?
//!         .run("tr", ["a-z", "A-Z"])?
//!         .var(&[])?
//!         .end()?
//!         .into_captured();
//!     println!("{:?}", upper);
//!
//!     if sh.command("make").ok() {
//!         sh.null(&[]).run("make", NO_ARGS)?;
//!     }
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("posh only supports Unix platforms");

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod shell;

// Re-export commonly used types
pub use command::{CommandRef, Resolution};
pub use error::{PoshError, Result};
pub use job::{Captured, Job, JobStatus, Stream, Target};
pub use shell::{Outcome, PathPosition, Shell, NO_ARGS};
