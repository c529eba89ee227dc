//! CLI integration tests.
//!
//! These tests verify argument parsing, configuration loading and the
//! behaviour of the `posh` binary itself.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use tempfile::NamedTempFile;

use posh::cli::{parse_args_from, Args};
use posh::config::Config;

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("posh")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn posh() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_posh"));
    cmd.env_remove("POSH_CWD")
        .env_remove("POSH_LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&["true"])).unwrap();

    assert_eq!(result.command.as_deref(), Some("true"));
    assert!(result.args.is_empty());
    assert!(result.config.is_none());
    assert!(result.cwd.is_none());
    assert!(result.stdin.is_none());
    assert!(result.stdout.is_none());
    assert!(result.stderr.is_none());
    assert!(!result.null);
    assert!(!result.which);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-c",
        "/etc/posh.json",
        "-C",
        "/tmp",
        "-l",
        "debug",
        "-i",
        "in.txt",
        "-o",
        "out.txt",
        "-e",
        "err.txt",
        "grep",
        "-v",
        "pattern",
    ]))
    .unwrap();

    assert_eq!(result.config, Some(PathBuf::from("/etc/posh.json")));
    assert_eq!(result.cwd, Some(PathBuf::from("/tmp")));
    assert_eq!(result.log_level, Some("debug".to_string()));
    assert_eq!(result.stdin, Some(PathBuf::from("in.txt")));
    assert_eq!(result.stdout, Some(PathBuf::from("out.txt")));
    assert_eq!(result.stderr, Some(PathBuf::from("err.txt")));
    assert_eq!(result.command.as_deref(), Some("grep"));
    assert_eq!(result.args, vec!["-v", "pattern"]);
}

#[test]
fn test_cli_options_after_command_belong_to_command() {
    let result = parse_args_from(args(&["echo", "-c", "--help"])).unwrap();

    assert!(result.config.is_none());
    assert!(!result.help);
    assert_eq!(result.args, vec!["-c", "--help"]);
}

#[test]
fn test_cli_missing_command() {
    let result = parse_args_from(args(&[]));
    assert!(result.is_err());
}

// ============================================================================
// Configuration Loading Tests
// ============================================================================

#[test]
fn test_config_from_json_file() {
    let json = r#"{
        "shell": {
            "cwd": "/",
            "inherit_env": false,
            "env": { "PATH": "/usr/bin:/bin", "LANG": "C" },
            "path_append": ["/usr/local/bin"]
        },
        "logging": {
            "level": "debug"
        }
    }"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.shell.cwd, Some(PathBuf::from("/")));
    assert!(!config.shell.inherit_env);
    assert_eq!(config.shell.env.len(), 2);
    assert_eq!(config.shell.path_append, vec![PathBuf::from("/usr/local/bin")]);
    assert_eq!(config.logging.level, "debug");

    let shell = config.build_shell().unwrap();
    assert_eq!(shell.get_env("LANG"), Some("C"));
    assert_eq!(shell.get_env("PATH"), Some("/usr/bin:/bin:/usr/local/bin"));
}

#[test]
fn test_config_priority_cli_over_file() {
    let json = r#"{
        "shell": { "cwd": "/" },
        "logging": { "level": "error" }
    }"#;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let args = Args {
        config: Some(file.path().to_path_buf()),
        cwd: Some(PathBuf::from("/tmp")),
        log_level: Some("trace".to_string()),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    // CLI values should win
    assert_eq!(config.shell.cwd, Some(PathBuf::from("/tmp")));
    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_config_missing_file() {
    let args = Args {
        config: Some(PathBuf::from("/nonexistent/posh.json")),
        ..Args::default()
    };

    assert!(Config::load(&args).is_err());
}

// ============================================================================
// Configuration Serialization Tests
// ============================================================================

#[test]
fn test_config_roundtrip() {
    let mut original = Config::default();
    original.shell.path_prepend.push(PathBuf::from("/opt/bin"));
    let json = serde_json::to_string(&original).unwrap();
    let loaded: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(original.shell.path_prepend, loaded.shell.path_prepend);
    assert_eq!(original.logging.level, loaded.logging.level);
}

#[test]
fn test_config_partial_deserialization() {
    // Only specify some fields, others should use defaults
    let json = r#"{"shell": {"env": {"A": "1"}}}"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.shell.env.get("A"), Some(&"1".to_string()));
    assert!(config.shell.inherit_env); // Default
    assert_eq!(config.logging.level, "warn"); // Default
}

// ============================================================================
// Binary Tests
// ============================================================================

#[test]
fn test_binary_propagates_exit_code() {
    let status = posh().args(["sh", "-c", "exit 7"]).status().unwrap();
    assert_eq!(status.code(), Some(7));

    let status = posh().arg("true").status().unwrap();
    assert!(status.success());
}

#[test]
fn test_binary_unknown_command() {
    let output = posh().arg("posh-no-such-binary").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("command not found: posh-no-such-binary"));
}

#[test]
fn test_binary_redirects_to_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "piped through\n").unwrap();

    let status = posh()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("cat")
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "piped through\n");
}

#[test]
fn test_binary_null_and_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let output = posh()
        .arg("-n")
        .arg("-C")
        .arg(dir.path())
        .args(["sh", "-c", "echo hidden; touch marker"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(dir.path().join("marker").exists());
}

#[test]
fn test_binary_relative_output_lands_in_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let status = posh()
        .arg("-C")
        .arg(dir.path())
        .args(["-o", "pwd.txt", "sh", "-c", "echo \"$PWD\""])
        .status()
        .unwrap();

    assert!(status.success());
    let canonical = dir.path().canonicalize().unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("pwd.txt")).unwrap(),
        format!("{}\n", canonical.display())
    );
}

#[test]
fn test_binary_which() {
    let output = posh().args(["--which", "sh"]).output().unwrap();
    assert!(output.status.success());
    let path = String::from_utf8_lossy(&output.stdout);
    assert!(path.trim().ends_with("/sh"));

    let output = posh().args(["-w", "posh-no-such-binary"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_binary_usage_errors() {
    let output = posh().output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = posh().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("posh "));
}
