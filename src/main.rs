//! pish entry point.
//!
//! Usage:
//!   pish               # Interactive prompt
//!   pish -c <line>     # Run one line and exit with its status

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use pish::session::{IOReader, PromptReader, Session};
use pish::{Config, JobRegistry, Reaper, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("PISH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("pish: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None => run_interactive(),

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("pish {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let line = args.get(2).context("-c requires a command argument")?;
            run_line(line)
        }

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'pish --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"pish {}

Usage:
  pish                 Interactive prompt
  pish -c <line>       Run one line and exit with its status

Options:
  -c <line>            Run a command line and exit
  -h, --help           Show this help
  -V, --version        Show version

Environment:
  PISH_PROMPT, PISH_HISTFILE, PISH_HISTSIZE, PISH_RC,
  PISH_MAX_STAGES, PISH_MAX_TOKENS, PISH_LOG"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// One line, no reaper: every foreground status is collected by the waiter.
fn run_line(line: &str) -> Result<ExitCode> {
    let config = Config::from_env();
    let mut shell = Shell::new(JobRegistry::new(), config.limits());
    let mut session = Session::new(IOReader::new(line.as_bytes()));

    let code = match session.all(&mut shell)? {
        Some(code) => code,
        None => shell.status(),
    };
    Ok(exit_code(code))
}

fn run_interactive() -> Result<ExitCode> {
    let config = Config::from_env();
    tracing::debug!(?config, "starting");

    let jobs = JobRegistry::new();
    let _reaper = Reaper::spawn(&jobs)?;
    let mut shell = Shell::new(jobs, config.limits());

    if let Some(rc) = config.rc_file.as_ref().filter(|p| p.is_file()) {
        let reader = IOReader::new_file(rc)
            .with_context(|| format!("Failed to open {}", rc.display()))?;
        if let Some(code) = Session::new(reader).all(&mut shell)? {
            return Ok(exit_code(code));
        }
    }

    let reader = PromptReader::new(&config)?;
    let code = match Session::new(reader).all(&mut shell)? {
        Some(code) => code,
        None => {
            println!();
            shell.status()
        }
    };
    Ok(exit_code(code))
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}
