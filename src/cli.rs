//! Command-line interface for posh.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Starting working directory.
    pub cwd: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// File to read stdin from.
    pub stdin: Option<PathBuf>,
    /// File to append stdout to.
    pub stdout: Option<PathBuf>,
    /// File to append stderr to.
    pub stderr: Option<PathBuf>,
    /// Discard stdout and stderr.
    pub null: bool,
    /// Print the resolved executable instead of running it.
    pub which: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
    /// Command name.
    pub command: Option<String>,
    /// Arguments passed through to the command untouched.
    pub args: Vec<OsString>,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
///
/// Options are only recognised before the command name; everything after
/// it belongs to the command.
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('C') | Long("cwd") => {
                result.cwd = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Short('i') | Long("stdin") => {
                result.stdin = Some(parser.value()?.parse()?);
            }
            Short('o') | Long("stdout") => {
                result.stdout = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("stderr") => {
                result.stderr = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("null") => {
                result.null = true;
            }
            Short('w') | Long("which") => {
                result.which = true;
            }
            Value(val) => {
                result.command = Some(val.string()?);
                result.args = parser.raw_args()?.collect();
                break;
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if result.command.is_none() && !result.help && !result.version {
        return Err(ArgsError::MissingCommand);
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"posh {version}
Run a command with redirections, without a shell

USAGE:
    posh [OPTIONS] [--] <COMMAND> [ARGS...]

OPTIONS:
    -c, --config <FILE>     Path to configuration file (JSON)
    -C, --cwd <DIR>         Starting working directory
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -i, --stdin <FILE>      Read stdin from FILE
    -o, --stdout <FILE>     Append stdout to FILE
    -e, --stderr <FILE>     Append stderr to FILE
    -n, --null              Discard stdout and stderr
    -w, --which             Print the resolved executable and exit
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    POSH_CWD                Starting directory (overrides config)
    POSH_LOG_LEVEL          Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Append a listing to a file
    posh -o listing.txt ls -l

    # Where would `grep` come from?
    posh --which grep

    # Run quietly from another directory
    posh -n -C /tmp make
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("posh {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// No command was given.
    MissingCommand,
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::MissingCommand => write!(f, "missing command"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("posh")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_command_only() {
        let result = parse_args_from(args(&["echo"])).unwrap();
        assert_eq!(result.command.as_deref(), Some("echo"));
        assert!(result.args.is_empty());
        assert!(!result.null);
    }

    #[test]
    fn test_command_args_pass_through() {
        let result = parse_args_from(args(&["-n", "ls", "-l", "--color", "-n"])).unwrap();
        assert!(result.null);
        assert_eq!(result.command.as_deref(), Some("ls"));
        assert_eq!(result.args, vec!["-l", "--color", "-n"]);
    }

    #[test]
    fn test_double_dash() {
        let result = parse_args_from(args(&["--", "-weird-name", "x"])).unwrap();
        assert_eq!(result.command.as_deref(), Some("-weird-name"));
        assert_eq!(result.args, vec!["x"]);
    }

    #[test]
    fn test_redirections() {
        let result =
            parse_args_from(args(&["-i", "in.txt", "--stdout", "out.txt", "-e", "err.txt", "cat"]))
                .unwrap();
        assert_eq!(result.stdin, Some(PathBuf::from("in.txt")));
        assert_eq!(result.stdout, Some(PathBuf::from("out.txt")));
        assert_eq!(result.stderr, Some(PathBuf::from("err.txt")));
    }

    #[test]
    fn test_config_and_cwd() {
        let result =
            parse_args_from(args(&["-c", "/etc/posh.json", "-C", "/tmp", "true"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/posh.json")));
        assert_eq!(result.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_which_and_log_level() {
        let result = parse_args_from(args(&["-w", "-l", "debug", "grep"])).unwrap();
        assert!(result.which);
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);

        let result = parse_args_from(args(&["--help"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_version_flag() {
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_missing_command() {
        let result = parse_args_from(args(&["-n"]));
        assert!(matches!(result, Err(ArgsError::MissingCommand)));
    }

    #[test]
    fn test_unknown_option() {
        let result = parse_args_from(args(&["--bogus", "ls"]));
        assert!(matches!(result, Err(ArgsError::Lexopt(_))));
    }

    #[test]
    fn test_missing_option_value() {
        let result = parse_args_from(args(&["-o"]));
        assert!(result.is_err());
    }
}
