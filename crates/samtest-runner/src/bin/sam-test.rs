//! `sam-test`: run registered tests against locally emulated functions.
//!
//! # Usage
//!
//! ```bash
//! sam-test                      # every test of every function
//! sam-test -f reverse.*         # every test of one function
//! sam-test -f reverse.2 -d      # one test, debugger port open
//! sam-test --transport command  # one emulator process per test
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use samtest_core::{DEFAULT_CONFIG_FILE, HarnessConfig, Transport};
use samtest_runner::{ConsoleReporter, Runner, Selection};
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl-C, as a shell would report it.
const INTERRUPTED: u8 = 130;

/// Local conformance runner for serverless functions
#[derive(Parser, Debug)]
#[command(name = "sam-test")]
#[command(version)]
#[command(about = "Run registered tests against locally emulated functions", long_about = None)]
struct Cli {
    /// Run one function's tests: NAME, NAME.* or NAME.INDEX (1-based)
    #[arg(short = 'f', long = "function", value_name = "NAME[.INDEX]")]
    function: Option<String>,

    /// Open the debugger port (requires -f NAME.INDEX)
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Configuration file (default: ./sam-test.toml if present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Deployed template to scan
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Directory holding <function>.json suite files
    #[arg(long = "tests-dir", value_name = "DIR")]
    tests_dir: Option<PathBuf>,

    /// Invocation transport: http or command
    #[arg(long, value_name = "TRANSPORT")]
    transport: Option<Transport>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => HarnessConfig::load_or_default(DEFAULT_CONFIG_FILE)?,
    };

    if let Some(template) = &cli.template {
        config.template.clone_from(template);
    }
    if let Some(tests_dir) = &cli.tests_dir {
        config.tests_dir.clone_from(tests_dir);
    }
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut reporter = ConsoleReporter::stdio();
    if cli.debug {
        reporter.debug_mode();
    }

    let config = load_config(&cli)?;
    let selection = match cli.function.as_deref() {
        Some(selector) => Selection::parse(selector)?,
        None => Selection::All,
    };

    let mut runner = Runner::from_config(&config, selection, cli.debug)?.with_reporter(reporter);
    tracing::debug!(runner = ?runner, transport = ?config.transport, "starting run");

    tokio::select! {
        state = runner.run() => Ok(state.exit_code()),
        _ = tokio::signal::ctrl_c() => {
            // Dropping the runner tears the emulator down.
            eprintln!("interrupted");
            Ok(INTERRUPTED)
        }
    }
}
