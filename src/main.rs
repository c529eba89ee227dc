//! posh binary entry point.

use std::error::Error;
use std::process::ExitCode;

use posh::cli::{self, Args};
use posh::config::Config;
use posh::{logging, Target};
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("posh: {}", e);
            eprintln!("Try 'posh --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("posh: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init_with_filter(config.log_filter()) {
        eprintln!("posh: invalid log filter: {}", e);
    }
    debug!("posh v{}", env!("CARGO_PKG_VERSION"));

    match run(&args, &config) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("posh: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &Config) -> Result<i32, Box<dyn Error>> {
    let mut shell = config.build_shell()?;
    let command = args.command.as_deref().unwrap_or_default();

    if args.which {
        return match shell.which(command) {
            Some(path) => {
                println!("{}", path.display());
                Ok(0)
            }
            None => {
                eprintln!("posh: {}: not found", command);
                Ok(1)
            }
        };
    }

    if args.null {
        shell.null(&[]);
    }
    shell.redir(
        args.stdin.clone().map(Target::from),
        args.stdout.clone().map(Target::from),
        args.stderr.clone().map(Target::from),
    )?;

    info!(command, args = args.args.len(), cwd = %shell.cwd().display(), "running");
    shell.run(command, &args.args)?;

    if !shell.error().is_empty() {
        eprintln!("posh: {}", shell.error());
    }
    Ok(shell.exit_code())
}
