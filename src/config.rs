//! Configuration management for posh.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::PoshError;
use crate::shell::{PathPosition, Shell};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial shell state.
    pub shell: ShellSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Initial state of the shell built from this configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// Starting working directory. Relative paths resolve against the
    /// process's directory; unset means the process's directory. The
    /// canonical path is also exported as `PWD`.
    pub cwd: Option<PathBuf>,
    /// Start from the process environment.
    pub inherit_env: bool,
    /// Variables set on top of the starting environment.
    pub env: HashMap<String, String>,
    /// Directories put in front of `PATH`, in order.
    pub path_prepend: Vec<PathBuf>,
    /// Directories added to the end of `PATH`, in order.
    pub path_append: Vec<PathBuf>,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            cwd: None,
            inherit_env: true,
            env: HashMap::new(),
            path_prepend: Vec::new(),
            path_append: Vec::new(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(cwd) = std::env::var("POSH_CWD") {
            if !cwd.is_empty() {
                self.shell.cwd = Some(PathBuf::from(cwd));
            }
        }

        if let Ok(level) = std::env::var("POSH_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref cwd) = args.cwd {
            self.shell.cwd = Some(cwd.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Build a shell in the configured state.
    pub fn build_shell(&self) -> Result<Shell, ConfigError> {
        let mut env: HashMap<String, String> = if self.shell.inherit_env {
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect()
        } else {
            HashMap::new()
        };
        env.extend(self.shell.env.clone());

        let process_cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        let cwd = match self.shell.cwd {
            Some(ref cwd) => process_cwd.join(cwd),
            None => process_cwd,
        };
        let cwd = match cwd.canonicalize() {
            Ok(dir) if dir.is_dir() => dir,
            _ => return Err(ConfigError::InvalidCwd(cwd)),
        };

        let mut shell = Shell::with_env(cwd.clone(), env);
        shell.enter_dir(cwd);
        for dir in self.shell.path_prepend.iter().rev() {
            shell
                .add_to_path(dir, PathPosition::Prepend)
                .map_err(ConfigError::Shell)?;
        }
        for dir in &self.shell.path_append {
            shell
                .add_to_path(dir, PathPosition::Append)
                .map_err(ConfigError::Shell)?;
        }
        Ok(shell)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file or the process directory.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Configured working directory is not a directory.
    InvalidCwd(PathBuf),
    /// The shell rejected a configured value.
    Shell(PoshError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidCwd(cwd) => write!(f, "not a directory: {}", cwd.display()),
            Self::Shell(e) => write!(f, "invalid shell configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
